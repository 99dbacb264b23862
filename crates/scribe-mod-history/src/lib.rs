/// Word-processor style undo/redo history for a rich-text surface.
///
/// Provides a `HistoryManager` that coalesces typing bursts into single undo
/// steps, commits discrete edits immediately, and captures a tree-independent
/// selection snapshot with every step so the caret can be put back after the
/// content tree has been replaced.
pub mod config;
pub mod entry;
pub mod manager;
pub mod selection;

pub use config::HistoryConfig;
pub use entry::{HistoryEntry, SerializedSelection};
pub use manager::{HistoryManager, HistoryState};
pub use selection::{LiveSelection, RestoreOutcome, RootAccessor};

/// Rich-text editing core: markup parsing, allowlist sanitization, and a
/// reference document model wired to the undo/redo history.
pub mod document;
pub mod editor;
pub mod history;
pub mod markup;
pub mod sanitize;

pub use document::{Document, NodeId, SharedDocument};
pub use editor::{Editor, Key};
pub use sanitize::{sanitize, sanitize_for_paste, AllowlistPolicy, BackendKind, Sanitizer};

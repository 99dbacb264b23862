// Re-exports from scribe-mod-history and the document-bound manager alias.
// Bridges the history crate's accessor trait with scribe-core's Document.
pub use scribe_mod_history::selection::{place_caret_at_end, resolve, restore, serialize};
pub use scribe_mod_history::{
    HistoryConfig, HistoryEntry, HistoryManager, HistoryState, LiveSelection, RestoreOutcome,
    RootAccessor, SerializedSelection,
};

use crate::document::SharedDocument;

/// History manager driving a [`SharedDocument`].
pub type DocumentHistory = HistoryManager<SharedDocument>;

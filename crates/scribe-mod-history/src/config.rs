/// Configuration for the history system.
use serde::{Deserialize, Serialize};

/// Maximum number of entries kept on the undo stack.
/// Oldest entries are evicted when this limit is exceeded.
const DEFAULT_MAX_SIZE: usize = 100;

/// Configuration for a `HistoryManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max entries on the undo stack.
    pub max_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl HistoryConfig {
    /// Creates a config with the given undo depth.
    pub fn with_max_size(max_size: usize) -> Self {
        let mut config = Self { max_size };
        config.sanitize();
        config
    }

    /// Clamps values to valid ranges (`max_size` is at least 1).
    pub fn sanitize(&mut self) {
        self.max_size = self.max_size.max(1);
    }
}

pub mod config;

pub use config::{EditorConfig, CONFIG_FILE_NAME, MAX_HISTORY_SIZE};

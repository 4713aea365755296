pub mod config;
pub mod error;
pub mod format;
pub mod kv;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod resume;
pub mod storage;
pub mod watch_store;

pub use error::ConwatchError;
pub use models::{Settings, Theme, WatchEntry, WatchEntryDraft, MAX_ENTRIES};
pub use watch_store::WatchStore;

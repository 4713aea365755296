mod entry;
mod settings;

pub use entry::{page_identity, WatchEntry, WatchEntryDraft, MAX_ENTRIES};
pub use settings::{Settings, Theme};

use tracing::{debug, info};

use crate::error::ConwatchError;
use crate::kv::{self, KeyValueStore};
use crate::models::{Settings, WatchEntry, WatchEntryDraft, MAX_ENTRIES};

pub const WATCHLIST_KEY: &str = "watchlist";
pub const SETTINGS_KEY: &str = "settings";

/// The bounded, pin-aware watch history over a [`KeyValueStore`].
///
/// The persisted list is kept newest-first. Every mutation is a single
/// read-modify-write of the whole list.
pub struct WatchStore<S> {
    kv: S,
}

impl<S: KeyValueStore> WatchStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    /// Insert `draft` at the front, replacing any entry with the same id.
    ///
    /// The pin flag of a replaced entry is carried over and `lastWatched`
    /// never moves backwards. If the list overflows, the last entry is
    /// dropped regardless of pin state.
    pub fn upsert(&self, draft: WatchEntryDraft) -> Result<WatchEntry, ConwatchError> {
        let saved = kv::update_json(&self.kv, WATCHLIST_KEY, |mut list: Vec<WatchEntry>| {
            let mut draft = draft.clone();
            let mut pinned = false;
            if let Some(pos) = list.iter().position(|e| e.id == draft.id) {
                let old = list.remove(pos);
                pinned = old.pinned;
                draft.last_watched = draft.last_watched.max(old.last_watched);
            }

            let entry = draft.into_entry(pinned);
            list.insert(0, entry.clone());
            if list.len() > MAX_ENTRIES {
                if let Some(evicted) = list.pop() {
                    debug!(id = %evicted.id, pinned = evicted.pinned, "Evicted oldest entry");
                }
            }
            Some((list, entry))
        })?;

        // `update_json` only yields `None` when the closure keeps the value.
        let entry = saved.ok_or_else(|| {
            ConwatchError::StorageUnavailable("upsert produced no write".into())
        })?;
        info!(id = %entry.id, timestamp = entry.timestamp, "Saved entry");
        Ok(entry)
    }

    /// Flip the pin flag. Returns the new state, or `None` if `id` is absent.
    pub fn toggle_pin(&self, id: &str) -> Result<Option<bool>, ConwatchError> {
        let toggled = kv::update_json(&self.kv, WATCHLIST_KEY, |mut list: Vec<WatchEntry>| {
            let entry = list.iter_mut().find(|e| e.id == id)?;
            entry.pinned = !entry.pinned;
            let pinned = entry.pinned;
            Some((list, pinned))
        })?;
        if let Some(pinned) = toggled {
            debug!(id, pinned, "Toggled pin");
        }
        Ok(toggled)
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> Result<bool, ConwatchError> {
        let removed = kv::update_json(&self.kv, WATCHLIST_KEY, |mut list: Vec<WatchEntry>| {
            let pos = list.iter().position(|e| e.id == id)?;
            list.remove(pos);
            Some((list, ()))
        })?;
        if removed.is_some() {
            debug!(id, "Deleted entry");
        }
        Ok(removed.is_some())
    }

    /// Entries whose title or hostname contains `filter` (case-insensitive),
    /// pinned first, then most recently watched.
    pub fn list(&self, filter: &str) -> Result<Vec<WatchEntry>, ConwatchError> {
        let needle = filter.to_lowercase();
        let mut list: Vec<WatchEntry> = kv::get_json(&self.kv, WATCHLIST_KEY)?;
        list.retain(|e| e.matches(&needle));
        list.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.last_watched.cmp(&a.last_watched))
        });
        Ok(list)
    }

    /// The persisted list in storage order (newest-first).
    pub fn entries(&self) -> Result<Vec<WatchEntry>, ConwatchError> {
        kv::get_json(&self.kv, WATCHLIST_KEY)
    }

    pub fn get(&self, id: &str) -> Result<Option<WatchEntry>, ConwatchError> {
        Ok(self.entries()?.into_iter().find(|e| e.id == id))
    }

    pub fn settings(&self) -> Result<Settings, ConwatchError> {
        kv::get_json(&self.kv, SETTINGS_KEY)
    }

    /// Apply `f` to the stored settings and persist the result.
    pub fn update_settings(
        &self,
        f: impl FnOnce(&mut Settings),
    ) -> Result<Settings, ConwatchError> {
        let mut f = Some(f);
        let saved = kv::update_json(&self.kv, SETTINGS_KEY, |mut settings: Settings| {
            if let Some(f) = f.take() {
                f(&mut settings);
            }
            Some((settings.clone(), settings))
        })?;
        saved.ok_or_else(|| ConwatchError::StorageUnavailable("settings write skipped".into()))
    }
}

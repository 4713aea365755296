use serde::{Deserialize, Serialize};
use url::Url;

/// Upper bound on stored entries.
pub const MAX_ENTRIES: usize = 50;

/// A save request as produced by a page context. Carries no pin state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntryDraft {
    pub id: String,
    pub url: String,
    pub hostname: String,
    pub title: String,
    #[serde(default)]
    pub episode: String,
    /// Playback position in seconds; 0 for page bookmarks.
    #[serde(default)]
    pub timestamp: f64,
    /// Total length in seconds; 0 when unknown.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub favicon: String,
    /// Save time, epoch milliseconds.
    pub last_watched: i64,
}

impl WatchEntryDraft {
    pub fn into_entry(self, pinned: bool) -> WatchEntry {
        WatchEntry {
            id: self.id,
            url: self.url,
            hostname: self.hostname,
            title: self.title,
            episode: self.episode,
            timestamp: self.timestamp,
            duration: self.duration,
            thumbnail: self.thumbnail,
            favicon: self.favicon,
            last_watched: self.last_watched,
            pinned,
        }
    }
}

/// One persisted record of a watched or bookmarked page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub id: String,
    pub url: String,
    pub hostname: String,
    pub title: String,
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub favicon: String,
    pub last_watched: i64,
    #[serde(default)]
    pub pinned: bool,
}

impl WatchEntry {
    /// Case-insensitive substring match on title or hostname.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.title.to_lowercase().contains(needle)
            || self.hostname.to_lowercase().contains(needle)
    }
}

/// Store key for a page: host (with port), path and query. The fragment is ignored.
pub fn page_identity(url: &Url) -> String {
    let mut id = String::new();
    if let Some(host) = url.host_str() {
        id.push_str(host);
    }
    if let Some(port) = url.port() {
        id.push(':');
        id.push_str(&port.to_string());
    }
    id.push_str(url.path());
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        id.push('?');
        id.push_str(query);
    }
    id
}

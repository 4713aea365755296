use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Stable handle to a video element within one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Rendered bounding box in CSS pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether any part of the box overlaps the viewport.
    pub fn intersects(&self, viewport: Viewport) -> bool {
        self.top < viewport.height
            && self.bottom() > 0.0
            && self.left < viewport.width
            && self.right() > 0.0
    }
}

/// Inner window dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Media element readiness, ordered like `HTMLMediaElement.readyState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Vendor-specific audio hints. Either may be missing depending on the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSignal {
    #[serde(default)]
    pub decoded_bytes_per_sample: Option<u32>,
    #[serde(default)]
    pub has_audio: Option<bool>,
}

/// Snapshot of one `<video>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoElement {
    pub id: VideoId,
    pub rect: Rect,
    /// Total length in seconds. `None` while unknown.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Resolved source URL; `None` when nothing is attached.
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub ready_state: ReadyState,
    #[serde(default = "default_true")]
    pub paused: bool,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub audio: AudioSignal,
    #[serde(default)]
    pub poster: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_volume() -> f64 {
    1.0
}

impl VideoElement {
    pub fn is_playing(&self) -> bool {
        !self.paused
    }

    /// Whether the element reports a non-silent audio track.
    pub fn has_audible_track(&self) -> bool {
        self.audio.decoded_bytes_per_sample.is_some_and(|b| b > 0)
            || self.audio.has_audio.unwrap_or(false)
            || (self.volume > 0.0 && !self.muted)
    }
}

/// A `<link>` element from the document head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkElement {
    pub rel: String,
    pub href: String,
}

impl LinkElement {
    /// Matches the `rel~="icon"` selector: `icon` as one whitespace-separated token.
    pub fn is_icon(&self) -> bool {
        self.rel
            .split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("icon"))
    }
}

/// Failure to control playback on a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("autoplay blocked: {0}")]
    AutoplayBlocked(String),
    #[error("video element {0} is gone")]
    Detached(VideoId),
}

/// Read access to the current state of a page.
pub trait PageObserver {
    /// Every video element currently in the document, in document order.
    fn videos(&self) -> Vec<VideoElement>;

    fn viewport(&self) -> Viewport;

    /// `document.title`; may be empty.
    fn title(&self) -> String;

    /// Full current locator, fragment included.
    fn location(&self) -> Url;

    /// Rendered text of the body.
    fn body_text(&self) -> String;

    fn links(&self) -> Vec<LinkElement>;
}

/// Mutating operations a page context may perform.
pub trait PageControl {
    fn seek(&mut self, video: &VideoId, position: f64) -> Result<(), PlaybackError>;

    fn play(&mut self, video: &VideoId) -> Result<(), PlaybackError>;

    /// Replace the locator in place, without a new history entry.
    fn replace_location(&mut self, url: Url);

    /// Show an on-page message that dismisses itself after `ttl`.
    fn show_notice(&mut self, text: &str, ttl: Duration);
}

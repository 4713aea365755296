//! Resume protocol: a `conwatch-t=<seconds>` fragment segment tells a freshly
//! loaded page where to seek its main video.

use std::sync::LazyLock;

use conwatch_detect::{PageControl, PageObserver, ReadyState, VideoId};
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ConwatchError;
use crate::models::WatchEntry;

/// Fragment key carrying the resume position.
pub const MARKER_KEY: &str = "conwatch-t";

/// What the fragment of a locator says about resuming.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Absent,
    /// Marker present but its value is not a finite number.
    Malformed(String),
    Position(f64),
}

/// Longest decimal prefix, as a browser's `parseFloat` reads it.
static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid number regex")
});

/// Look for the resume marker among the `&`-separated fragment segments.
pub fn find_marker(url: &Url) -> Marker {
    let Some(fragment) = url.fragment() else {
        return Marker::Absent;
    };
    let prefix = format!("{MARKER_KEY}=");
    let Some(raw) = fragment.split('&').find_map(|seg| seg.strip_prefix(prefix.as_str())) else {
        return Marker::Absent;
    };
    let value = NUMBER_PREFIX
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok());
    match value {
        Some(v) if v.is_finite() => Marker::Position(v),
        _ => Marker::Malformed(raw.to_string()),
    }
}

/// Remove the marker segment; drop the fragment entirely if nothing remains.
pub fn strip_marker(url: &Url) -> Url {
    let mut out = url.clone();
    let Some(fragment) = url.fragment() else {
        return out;
    };
    let prefix = format!("{MARKER_KEY}=");
    let rest: Vec<&str> = fragment
        .split('&')
        .filter(|seg| !seg.starts_with(prefix.as_str()))
        .collect();
    if rest.iter().all(|seg| seg.is_empty()) {
        out.set_fragment(None);
    } else {
        out.set_fragment(Some(&rest.join("&")));
    }
    out
}

/// Locator that reopens `entry` at its saved position.
///
/// Entries without progress (page bookmarks) open without a marker.
pub fn resume_url(entry: &WatchEntry) -> Result<Url, ConwatchError> {
    let mut url = Url::parse(&entry.url)?;
    if entry.timestamp > 0.0 {
        let marker = format!("{MARKER_KEY}={}", entry.timestamp);
        let fragment = match url.fragment() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{marker}"),
            _ => marker,
        };
        url.set_fragment(Some(&fragment));
    }
    Ok(url)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeState {
    Idle,
    /// Waiting for a video with loaded metadata.
    Scanning { position: f64 },
    Resumed { video: VideoId, position: f64 },
    TimedOut,
}

/// Per-navigation resume state machine.
///
/// Timing lives with the caller: it calls [`poll`](Self::poll) on a fixed
/// interval while [`is_scanning`](Self::is_scanning) and
/// [`expire`](Self::expire) once the deadline passes.
#[derive(Debug)]
pub struct ResumeCoordinator {
    state: ResumeState,
}

impl Default for ResumeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumeCoordinator {
    pub fn new() -> Self {
        Self {
            state: ResumeState::Idle,
        }
    }

    pub fn state(&self) -> &ResumeState {
        &self.state
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, ResumeState::Scanning { .. })
    }

    /// Restart from `Idle` for a new locator.
    pub fn on_navigation(&mut self, location: &Url) -> &ResumeState {
        self.state = match find_marker(location) {
            Marker::Absent => ResumeState::Idle,
            Marker::Malformed(raw) => {
                debug!(value = %raw, "Ignoring malformed resume marker");
                ResumeState::Idle
            }
            Marker::Position(position) => {
                info!(position, "Attempting to resume");
                ResumeState::Scanning { position }
            }
        };
        &self.state
    }

    /// One scan tick. Seeks and plays the main video once its metadata is loaded.
    pub fn poll<P>(&mut self, page: &mut P) -> &ResumeState
    where
        P: PageObserver + PageControl + ?Sized,
    {
        let ResumeState::Scanning { position } = self.state else {
            return &self.state;
        };

        let Some(video) = conwatch_detect::main_video(&*page) else {
            return &self.state;
        };
        if video.ready_state < ReadyState::HaveMetadata {
            return &self.state;
        }

        if let Err(e) = page.seek(&video.id, position) {
            warn!(video = %video.id, error = %e, "Seek failed, still scanning");
            return &self.state;
        }
        if let Err(e) = page.play(&video.id) {
            debug!(video = %video.id, error = %e, "Autoplay blocked by browser");
        }

        let stripped = strip_marker(&page.location());
        page.replace_location(stripped);

        info!(video = %video.id, position, "Resumed playback");
        self.state = ResumeState::Resumed {
            video: video.id,
            position,
        };
        &self.state
    }

    /// Drop whatever the previous locator started and wait for the next one.
    pub fn reset(&mut self) {
        if self.is_scanning() {
            debug!("Resume scan cancelled by navigation");
        }
        self.state = ResumeState::Idle;
    }

    /// Give up scanning. The locator is left as is.
    pub fn expire(&mut self) -> &ResumeState {
        if self.is_scanning() {
            debug!("No video became ready before the resume timeout");
            self.state = ResumeState::TimedOut;
        }
        &self.state
    }
}

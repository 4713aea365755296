use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::page::{
    AudioSignal, LinkElement, PageControl, PageObserver, PlaybackError, ReadyState, Rect,
    VideoElement, VideoId, Viewport,
};

/// A static, serializable page.
///
/// Captured page state (e.g. dumped from a browser devtools session) is
/// loaded from JSON and driven through the same traits as a live page.
/// Control operations mutate the snapshot so effects can be inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub location: Url,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_text: String,
    #[serde(default)]
    pub links: Vec<LinkElement>,
    #[serde(default)]
    pub videos: Vec<VideoElement>,
    #[serde(default)]
    pub viewport: Viewport,
    /// Reject `play()` calls, as a browser does without a user gesture.
    #[serde(default)]
    pub autoplay_blocked: bool,
    /// Notices shown so far, oldest first.
    #[serde(default, skip_deserializing)]
    pub notices: Vec<String>,
}

impl PageSnapshot {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            title: String::new(),
            body_text: String::new(),
            links: Vec::new(),
            videos: Vec::new(),
            viewport: Viewport::default(),
            autoplay_blocked: false,
            notices: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// A loaded, visible, paused 640x360 video of 24 minutes.
    pub fn sample_video(id: &str) -> VideoElement {
        VideoElement {
            id: VideoId::from(id),
            rect: Rect {
                left: 0.0,
                top: 0.0,
                width: 640.0,
                height: 360.0,
            },
            duration: Some(1440.0),
            src: Some(format!("blob:https://example.com/{id}")),
            ready_state: ReadyState::HaveEnoughData,
            paused: true,
            current_time: 0.0,
            volume: 1.0,
            muted: false,
            audio: AudioSignal::default(),
            poster: None,
        }
    }

    pub fn video(&self, id: &VideoId) -> Option<&VideoElement> {
        self.videos.iter().find(|v| &v.id == id)
    }

    fn video_mut(&mut self, id: &VideoId) -> Result<&mut VideoElement, PlaybackError> {
        self.videos
            .iter_mut()
            .find(|v| &v.id == id)
            .ok_or_else(|| PlaybackError::Detached(id.clone()))
    }
}

impl PageObserver for PageSnapshot {
    fn videos(&self) -> Vec<VideoElement> {
        self.videos.clone()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn location(&self) -> Url {
        self.location.clone()
    }

    fn body_text(&self) -> String {
        self.body_text.clone()
    }

    fn links(&self) -> Vec<LinkElement> {
        self.links.clone()
    }
}

impl PageControl for PageSnapshot {
    fn seek(&mut self, video: &VideoId, position: f64) -> Result<(), PlaybackError> {
        let v = self.video_mut(video)?;
        v.current_time = match v.duration {
            Some(d) => position.clamp(0.0, d),
            None => position.max(0.0),
        };
        Ok(())
    }

    fn play(&mut self, video: &VideoId) -> Result<(), PlaybackError> {
        if self.autoplay_blocked {
            return Err(PlaybackError::AutoplayBlocked(
                "play() requires a user gesture".into(),
            ));
        }
        self.video_mut(video)?.paused = false;
        Ok(())
    }

    fn replace_location(&mut self, url: Url) {
        self.location = url;
    }

    fn show_notice(&mut self, text: &str, _ttl: Duration) {
        self.notices.push(text.to_string());
    }
}

use chrono::Utc;
use conwatch_detect::{PageObserver, VideoElement};
use tracing::debug;
use url::Url;

use crate::error::ConwatchError;
use crate::models::{page_identity, Settings, WatchEntryDraft};
use crate::policy;

pub const NOTICE_SAVED: &str = "Saved to Conwatch";
pub const NOTICE_NO_VIDEO: &str = "No video found to save. Use the + button to bookmark the page.";

/// What started a save evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User asked for it; always allowed, always reported.
    Manual,
    /// Timer tick; silent and subject to the autosave policy.
    Periodic,
}

impl Trigger {
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

/// Outcome of one save evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved { id: String, timestamp: f64 },
    NoVideoFound,
    /// Periodic tick on a paused video; unattended progress is not recorded.
    Paused,
    AutoSaveDenied,
    /// The store owner was unreachable or reported failure.
    Failed(String),
}

/// Save time for a new draft, epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Detect the main video and apply the trigger-specific skips.
pub fn select_video<P: PageObserver + ?Sized>(
    page: &P,
    trigger: Trigger,
) -> Result<VideoElement, SaveOutcome> {
    let Some(video) = conwatch_detect::main_video(page) else {
        debug!(?trigger, "No video on page");
        return Err(SaveOutcome::NoVideoFound);
    };
    if trigger == Trigger::Periodic && video.paused {
        debug!(video = %video.id, "Video paused, skipping periodic save");
        return Err(SaveOutcome::Paused);
    }
    Ok(video)
}

/// Apply the autosave allow-list to periodic saves. Manual saves always pass.
pub fn check_policy(
    location: &Url,
    trigger: Trigger,
    settings: &Settings,
) -> Result<(), SaveOutcome> {
    if trigger.is_manual() {
        return Ok(());
    }
    let host = location.host_str().unwrap_or_default();
    if policy::allow_auto_save(host, &settings.autosave) {
        Ok(())
    } else {
        debug!(host, "Autosave not enabled for host");
        Err(SaveOutcome::AutoSaveDenied)
    }
}

/// Build a draft from the page's current state and its main video.
pub fn video_draft<P: PageObserver + ?Sized>(
    page: &P,
    video: &VideoElement,
    now_ms: i64,
) -> WatchEntryDraft {
    let location = page.location();
    let meta = conwatch_detect::extract(Some(video), page);
    let duration = video.duration.filter(|d| d.is_finite()).unwrap_or(0.0);

    WatchEntryDraft {
        id: page_identity(&location),
        url: without_fragment(&location),
        hostname: location.host_str().unwrap_or_default().to_string(),
        title: meta.title,
        episode: meta.episode,
        timestamp: video.current_time,
        duration,
        thumbnail: meta.thumbnail,
        favicon: meta.favicon,
        last_watched: now_ms,
    }
}

/// Build a progress-less bookmark from tab metadata.
pub fn bookmark_draft(
    tab_url: &str,
    tab_title: Option<&str>,
    fav_icon_url: Option<&str>,
    now_ms: i64,
) -> Result<WatchEntryDraft, ConwatchError> {
    let location = Url::parse(tab_url)?;
    let url = without_fragment(&location);
    let title = tab_title
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.clone());
    let favicon = fav_icon_url
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/favicon.ico", location.origin().ascii_serialization()));

    Ok(WatchEntryDraft {
        id: page_identity(&location),
        url,
        hostname: location.host_str().unwrap_or_default().to_string(),
        title,
        episode: String::new(),
        timestamp: 0.0,
        duration: 0.0,
        thumbnail: String::new(),
        favicon,
        last_watched: now_ms,
    })
}

fn without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

#[cfg(test)]
mod tests {
    use conwatch_detect::PageSnapshot;

    use super::*;

    fn page(url: &str) -> PageSnapshot {
        let mut page = PageSnapshot::new(Url::parse(url).unwrap());
        page.title = "Frieren - Episode 5 - Crunchyroll".into();
        page.body_text = "Frieren S01E05 The Hero's Party".into();
        page
    }

    fn settings(autosave: &str) -> Settings {
        Settings {
            autosave: autosave.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_video() {
        let p = page("https://www.crunchyroll.com/watch/1");
        assert_eq!(
            select_video(&p, Trigger::Manual).unwrap_err(),
            SaveOutcome::NoVideoFound
        );
        assert_eq!(
            select_video(&p, Trigger::Periodic).unwrap_err(),
            SaveOutcome::NoVideoFound
        );
    }

    #[test]
    fn test_paused_only_blocks_periodic() {
        let mut p = page("https://www.crunchyroll.com/watch/1");
        p.videos.push(PageSnapshot::sample_video("v"));
        assert_eq!(
            select_video(&p, Trigger::Periodic).unwrap_err(),
            SaveOutcome::Paused
        );
        assert!(select_video(&p, Trigger::Manual).is_ok());
    }

    #[test]
    fn test_policy_gate() {
        let loc = Url::parse("https://www.example.com/v").unwrap();
        assert_eq!(
            check_policy(&loc, Trigger::Periodic, &settings("")),
            Err(SaveOutcome::AutoSaveDenied)
        );
        assert_eq!(check_policy(&loc, Trigger::Periodic, &settings("example.com")), Ok(()));
        assert_eq!(check_policy(&loc, Trigger::Manual, &settings("")), Ok(()));

        let other = Url::parse("https://www.other.org/v").unwrap();
        assert_eq!(
            check_policy(&other, Trigger::Periodic, &settings("example.com")),
            Err(SaveOutcome::AutoSaveDenied)
        );
    }

    #[test]
    fn test_video_draft_fields() {
        let mut p = page("https://www.crunchyroll.com/watch/1?lang=en#conwatch-t=5");
        let mut v = PageSnapshot::sample_video("v");
        v.current_time = 321.5;
        v.poster = Some("https://img.example.com/p.jpg".into());
        p.videos.push(v.clone());

        let d = video_draft(&p, &v, 1_000);
        assert_eq!(d.id, "www.crunchyroll.com/watch/1?lang=en");
        assert_eq!(d.url, "https://www.crunchyroll.com/watch/1?lang=en");
        assert_eq!(d.hostname, "www.crunchyroll.com");
        assert_eq!(d.title, "Frieren");
        assert_eq!(d.episode, "S01E05");
        assert_eq!(d.timestamp, 321.5);
        assert_eq!(d.duration, 1440.0);
        assert_eq!(d.thumbnail, "https://img.example.com/p.jpg");
        assert_eq!(d.favicon, "https://www.crunchyroll.com/favicon.ico");
        assert_eq!(d.last_watched, 1_000);
    }

    #[test]
    fn test_unknown_or_infinite_duration_is_zero() {
        let p = page("https://live.example.com/stream");
        let mut v = PageSnapshot::sample_video("v");
        v.duration = Some(f64::INFINITY);
        assert_eq!(video_draft(&p, &v, 0).duration, 0.0);
        v.duration = None;
        assert_eq!(video_draft(&p, &v, 0).duration, 0.0);
    }

    #[test]
    fn test_bookmark_draft() {
        let d = bookmark_draft(
            "https://blog.example.com/post/1?ref=x#comments",
            Some("A post"),
            None,
            7,
        )
        .unwrap();
        assert_eq!(d.id, "blog.example.com/post/1?ref=x");
        assert_eq!(d.url, "https://blog.example.com/post/1?ref=x");
        assert_eq!(d.title, "A post");
        assert_eq!(d.timestamp, 0.0);
        assert_eq!(d.duration, 0.0);
        assert_eq!(d.favicon, "https://blog.example.com/favicon.ico");

        let untitled = bookmark_draft("https://a.com/x", None, Some("https://a.com/i.png"), 7).unwrap();
        assert_eq!(untitled.title, "https://a.com/x");
        assert_eq!(untitled.favicon, "https://a.com/i.png");

        assert!(matches!(
            bookmark_draft("not a url", None, None, 0),
            Err(ConwatchError::InvalidUrl(_))
        ));
    }
}

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::page::{PageObserver, VideoElement};

/// Site suffix separator, as in "Show Name - SiteName".
const TITLE_SEPARATOR: &str = " - ";

/// Only the head of the body text is scanned for an episode label.
const EPISODE_SCAN_CHARS: usize = 5000;

static RE_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)S(\d+)E(\d+)|Season\s(\d+)|Episode\s(\d+)").expect("valid episode regex")
});

/// Display metadata derived from a page and its main video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub episode: String,
    pub thumbnail: String,
    pub favicon: String,
}

/// Extract metadata for `video` (or for the bare page when `None`).
pub fn extract<P: PageObserver + ?Sized>(video: Option<&VideoElement>, page: &P) -> Metadata {
    let location = page.location();

    let episode = match video {
        Some(_) => episode_label(&page.body_text()),
        None => String::new(),
    };

    Metadata {
        title: page_title(&page.title(), &location),
        episode,
        thumbnail: video
            .and_then(|v| v.poster.clone())
            .unwrap_or_default(),
        favicon: favicon(page, &location),
    }
}

/// Trim a trailing site name from the document title.
pub fn page_title(document_title: &str, location: &Url) -> String {
    let raw = if document_title.is_empty() {
        location.as_str()
    } else {
        document_title
    };
    match raw.split(TITLE_SEPARATOR).next() {
        Some(head) if !head.is_empty() => head.to_string(),
        _ => raw.to_string(),
    }
}

/// First `SxxEyy`, `Season N` or `Episode N` occurrence in the head of `text`.
pub fn episode_label(text: &str) -> String {
    let head = match text.char_indices().nth(EPISODE_SCAN_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    };
    RE_EPISODE
        .find(head)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn favicon<P: PageObserver + ?Sized>(page: &P, location: &Url) -> String {
    page.links()
        .iter()
        .find(|link| link.is_icon())
        .and_then(|link| location.join(&link.href).ok())
        .map(String::from)
        .unwrap_or_else(|| format!("{}/favicon.ico", location.origin().ascii_serialization()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::LinkElement;
    use crate::snapshot::PageSnapshot;

    fn page(title: &str, body: &str) -> PageSnapshot {
        let mut page = PageSnapshot::new(Url::parse("https://watch.example.com/show/1?ep=2").unwrap());
        page.title = title.into();
        page.body_text = body.into();
        page
    }

    #[test]
    fn test_title_trims_site_suffix() {
        let loc = Url::parse("https://a.example/").unwrap();
        assert_eq!(page_title("Frieren - Episode 5 - Crunchyroll", &loc), "Frieren");
        assert_eq!(page_title("No separator here", &loc), "No separator here");
        assert_eq!(page_title("Show \u{2014} SiteName", &loc), "Show \u{2014} SiteName");
    }

    #[test]
    fn test_title_falls_back() {
        let loc = Url::parse("https://a.example/path").unwrap();
        assert_eq!(page_title("", &loc), "https://a.example/path");
        // Leading separator leaves an empty head; keep the raw title.
        assert_eq!(page_title(" - Orphan", &loc), " - Orphan");
    }

    #[test]
    fn test_episode_patterns() {
        assert_eq!(episode_label("Now playing Season 2 of the show"), "Season 2");
        assert_eq!(episode_label("Frieren s01e05 1080p"), "s01e05");
        assert_eq!(episode_label("watch EPISODE 12 now"), "EPISODE 12");
        assert_eq!(episode_label("nothing to see"), "");
    }

    #[test]
    fn test_episode_first_match_wins() {
        assert_eq!(episode_label("Episode 3 ... Season 1"), "Episode 3");
    }

    #[test]
    fn test_episode_scan_is_bounded() {
        let text = format!("{}Season 9", "x".repeat(EPISODE_SCAN_CHARS));
        assert_eq!(episode_label(&text), "");
        let text = format!("{}Season 9", "é".repeat(EPISODE_SCAN_CHARS - 8));
        assert_eq!(episode_label(&text), "Season 9");
    }

    #[test]
    fn test_extract_without_video_skips_episode() {
        let p = page("Show - Site", "Season 2 is here");
        let meta = extract(None, &p);
        assert_eq!(meta.title, "Show");
        assert_eq!(meta.episode, "");
        assert_eq!(meta.thumbnail, "");
    }

    #[test]
    fn test_extract_with_video() {
        let mut p = page("Show - Site", "Season 2 is here");
        let mut video = PageSnapshot::sample_video("main");
        video.poster = Some("https://cdn.example.com/poster.jpg".into());
        p.videos.push(video.clone());

        let meta = extract(Some(&video), &p);
        assert_eq!(meta.episode, "Season 2");
        assert_eq!(meta.thumbnail, "https://cdn.example.com/poster.jpg");
    }

    #[test]
    fn test_favicon_from_link() {
        let mut p = page("t", "");
        p.links = vec![
            LinkElement {
                rel: "stylesheet".into(),
                href: "/style.css".into(),
            },
            LinkElement {
                rel: "shortcut icon".into(),
                href: "/static/icon.png".into(),
            },
        ];
        assert_eq!(
            extract(None, &p).favicon,
            "https://watch.example.com/static/icon.png"
        );
    }

    #[test]
    fn test_favicon_default() {
        let p = page("t", "");
        assert_eq!(extract(None, &p).favicon, "https://watch.example.com/favicon.ico");
    }
}

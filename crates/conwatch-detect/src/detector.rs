use tracing::trace;

use crate::page::{ReadyState, VideoElement, Viewport};

/// Score assigned to candidates that can never be selected.
pub const EXCLUDED: f64 = -1.0;

const MIN_WIDTH: f64 = 200.0;
const MIN_HEIGHT: f64 = 150.0;
const MIN_DURATION_SECS: f64 = 10.0;

const PLAYING_BOOST: f64 = 1.5;
const VISIBLE_BOOST: f64 = 1.2;
const OFFSCREEN_PENALTY: f64 = 0.5;
const AUDIO_BOOST: f64 = 1.2;

/// Score a single candidate. Returns [`EXCLUDED`] for ads, previews and
/// elements that have not started loading.
pub fn score(video: &VideoElement, viewport: Viewport) -> f64 {
    let rect = video.rect;
    let too_short = video.duration.is_some_and(|d| d < MIN_DURATION_SECS);
    let no_source = video.src.as_deref().map_or(true, str::is_empty);

    if rect.width < MIN_WIDTH
        || rect.height < MIN_HEIGHT
        || too_short
        || no_source
        || video.ready_state == ReadyState::HaveNothing
    {
        return EXCLUDED;
    }

    let mut score = rect.area();
    if video.is_playing() {
        score *= PLAYING_BOOST;
    }
    if rect.intersects(viewport) {
        score *= VISIBLE_BOOST;
    } else {
        score *= OFFSCREEN_PENALTY;
    }
    if video.has_audible_track() {
        score *= AUDIO_BOOST;
    }
    score
}

/// Pick the most relevant video among `videos`.
///
/// Ties keep the element encountered first.
pub fn detect(videos: &[VideoElement], viewport: Viewport) -> Option<&VideoElement> {
    let mut best: Option<(&VideoElement, f64)> = None;

    for video in videos {
        let s = score(video, viewport);
        trace!(video = %video.id, score = s, "Scored video candidate");
        if s <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((video, s)),
        }
    }

    best.map(|(video, _)| video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{AudioSignal, Rect, VideoId};

    fn viewport() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 720.0,
        }
    }

    fn video(id: &str, width: f64, height: f64) -> VideoElement {
        VideoElement {
            id: VideoId::from(id),
            rect: Rect {
                left: 0.0,
                top: 0.0,
                width,
                height,
            },
            duration: Some(1440.0),
            src: Some(format!("blob:https://example.com/{id}")),
            ready_state: ReadyState::HaveEnoughData,
            paused: true,
            current_time: 0.0,
            volume: 0.0,
            muted: true,
            audio: AudioSignal::default(),
            poster: None,
        }
    }

    #[test]
    fn test_base_score_is_area() {
        let v = video("a", 400.0, 300.0);
        // Visible, paused, silent.
        assert!((score(&v, viewport()) - 400.0 * 300.0 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_all_boosts_apply_in_order() {
        let mut v = video("a", 400.0, 300.0);
        v.paused = false;
        v.volume = 0.5;
        v.muted = false;
        let expected = 400.0 * 300.0 * 1.5 * 1.2 * 1.2;
        assert!((score(&v, viewport()) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_offscreen_penalty() {
        let mut v = video("a", 400.0, 300.0);
        v.rect.top = 2000.0;
        assert!((score(&v, viewport()) - 400.0 * 300.0 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_thresholds_exclude() {
        let narrow = video("narrow", 199.0, 400.0);
        let short = video("short", 400.0, 149.0);

        let mut clip = video("clip", 800.0, 450.0);
        clip.duration = Some(9.5);

        let mut no_src = video("nosrc", 800.0, 450.0);
        no_src.src = None;

        let mut empty_src = video("empty", 800.0, 450.0);
        empty_src.src = Some(String::new());

        let mut unloaded = video("unloaded", 800.0, 450.0);
        unloaded.ready_state = ReadyState::HaveNothing;

        for v in [&narrow, &short, &clip, &no_src, &empty_src, &unloaded] {
            assert_eq!(score(v, viewport()), EXCLUDED, "{} should be excluded", v.id);
        }
    }

    #[test]
    fn test_excluded_never_selected_despite_signals() {
        let mut clip = video("ad", 1920.0, 1080.0);
        clip.duration = Some(5.0);
        clip.paused = false;
        clip.volume = 1.0;
        clip.muted = false;

        let small = video("main", 320.0, 180.0);

        let videos = [clip, small];
        let picked = detect(&videos, viewport()).unwrap();
        assert_eq!(picked.id.0, "main");
    }

    #[test]
    fn test_unknown_duration_is_not_excluded() {
        let mut live = video("live", 640.0, 360.0);
        live.duration = None;
        assert!(score(&live, viewport()) > 0.0);
    }

    #[test]
    fn test_playing_beats_larger_paused() {
        let big_paused = video("big", 700.0, 400.0);
        let mut small_playing = video("small", 640.0, 360.0);
        small_playing.paused = false;
        // 700*400 = 280000 vs 640*360*1.5 = 345600.
        let videos = [big_paused, small_playing];
        let picked = detect(&videos, viewport()).unwrap();
        assert_eq!(picked.id.0, "small");
    }

    #[test]
    fn test_tie_keeps_first() {
        let a = video("first", 640.0, 360.0);
        let b = video("second", 640.0, 360.0);
        let videos = [a, b];
        for _ in 0..10 {
            let picked = detect(&videos, viewport()).unwrap();
            assert_eq!(picked.id.0, "first");
        }
    }

    #[test]
    fn test_no_candidates() {
        assert!(detect(&[], viewport()).is_none());
        let videos = [video("tiny", 100.0, 100.0)];
        assert!(detect(&videos, viewport()).is_none());
    }
}

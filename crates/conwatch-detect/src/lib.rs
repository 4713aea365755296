pub mod detector;
pub mod metadata;
pub mod page;
pub mod snapshot;

pub use detector::{detect, score, EXCLUDED};
pub use metadata::{extract, Metadata};
pub use page::{
    AudioSignal, LinkElement, PageControl, PageObserver, PlaybackError, ReadyState, Rect,
    VideoElement, VideoId, Viewport,
};
pub use snapshot::PageSnapshot;

/// Find the main video on a page.
///
/// Convenience wrapper that pulls candidates and viewport from the observer.
pub fn main_video<P: PageObserver + ?Sized>(page: &P) -> Option<VideoElement> {
    let videos = page.videos();
    let viewport = page.viewport();
    detect(&videos, viewport).cloned()
}

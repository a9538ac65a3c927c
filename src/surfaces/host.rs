use anyhow::Result;
use image::DynamicImage;

use crate::models::{Rect, SurfaceKey, VideoSurface};

/// The page that owns the video elements.
///
/// Implementations only read host state; nothing here mutates the elements.
pub trait SurfaceHost: Send + Sync + 'static {
    /// Every video element currently in the visual tree, in document order.
    fn surfaces(&self) -> Result<Vec<VideoSurface>>;

    /// Current page scroll offset `(x, y)`.
    fn scroll_offset(&self) -> (f64, f64);

    /// Fresh viewport-relative bounds of one element, `None` once it is gone.
    fn bounds(&self, key: &SurfaceKey) -> Option<Rect>;

    /// The element's current frame at native resolution.
    fn grab_frame(&self, key: &SurfaceKey) -> Result<DynamicImage>;

    /// Bounds in page space, where overlays are positioned.
    fn page_bounds(&self, key: &SurfaceKey) -> Option<Rect> {
        let (scroll_x, scroll_y) = self.scroll_offset();
        self.bounds(key).map(|rect| rect.offset_by(scroll_x, scroll_y))
    }
}

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Shift a viewport-relative rectangle into page space.
    pub fn offset_by(&self, scroll_x: f64, scroll_y: f64) -> Self {
        Self {
            left: self.left + scroll_x,
            top: self.top + scroll_y,
            ..*self
        }
    }

    pub fn exceeds(&self, min_side: f64) -> bool {
        self.width > min_side && self.height > min_side
    }
}

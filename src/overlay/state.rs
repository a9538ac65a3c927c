use serde::{Deserialize, Serialize};

use crate::models::{Judgment, ParticipantId, Rect};

pub const BORDER_WIDTH_PX: u32 = 5;
pub const BORDER_RADIUS_PX: u32 = 12;
pub const OVERLAY_Z_INDEX: u32 = 9999;

/// Annotation drawn over one participant's tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayState {
    pub participant_id: ParticipantId,
    /// Page-space rectangle mirroring the tile.
    pub bounds: Rect,
    pub border_color: String,
    pub label: String,
    pub judgment: Judgment,
}

impl OverlayState {
    pub fn new(participant_id: ParticipantId, judgment: Judgment, bounds: Rect) -> Self {
        Self {
            participant_id,
            bounds,
            border_color: judgment.status.color().to_string(),
            label: judgment.label(),
            judgment,
        }
    }

    /// Inline style for an absolutely positioned, click-through frame.
    pub fn style(&self) -> String {
        format!(
            "position:absolute; left:{}px; top:{}px; width:{}px; height:{}px; \
             border:{}px solid {}; border-radius:{}px; box-sizing:border-box; \
             pointer-events:none; z-index:{}; transition:all 0.3s ease-out;",
            self.bounds.left,
            self.bounds.top,
            self.bounds.width,
            self.bounds.height,
            BORDER_WIDTH_PX,
            self.border_color,
            BORDER_RADIUS_PX,
            OVERLAY_Z_INDEX,
        )
    }
}

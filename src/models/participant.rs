use serde::{Deserialize, Serialize};
use std::fmt;

use super::Rect;

/// Session-stable identity of one video tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-side handle of a video element. Stable for as long as the element
/// stays in the host's visual tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceKey(String);

impl SurfaceKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a host-owned video element, read once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSurface {
    pub key: SurfaceKey,
    /// Decoded frame size; zero until the stream has produced a frame.
    pub native_width: u32,
    pub native_height: u32,
    /// Viewport-relative bounding rectangle.
    pub bounds: Rect,
    /// Enough data buffered to draw the current frame.
    pub ready: bool,
}

/// A downscaled still of one tile, encoded for the wire.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub participant_id: ParticipantId,
    /// `data:image/jpeg;base64,...`
    pub image: String,
}

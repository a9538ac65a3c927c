pub mod geometry;
pub mod judgment;
pub mod participant;

pub use geometry::Rect;
pub use judgment::{AttentionStatus, Judgment};
pub use participant::{ParticipantId, SampledFrame, SurfaceKey, VideoSurface};

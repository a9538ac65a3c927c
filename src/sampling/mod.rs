pub mod sampler;

pub use sampler::{FrameSampler, JPEG_QUALITY, MAX_FRAME_WIDTH};

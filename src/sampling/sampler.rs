use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};

use crate::models::{ParticipantId, SampledFrame, VideoSurface};
use crate::surfaces::SurfaceHost;

pub const MAX_FRAME_WIDTH: u32 = 480;
pub const JPEG_QUALITY: u8 = 70;

/// Turns a tile's current frame into a small JPEG for the backend.
///
/// Each call rasterizes into its own buffer, so tiles can be sampled
/// concurrently without one frame bleeding into another.
#[derive(Debug, Clone, Copy)]
pub struct FrameSampler {
    max_width: u32,
    quality: u8,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(MAX_FRAME_WIDTH, JPEG_QUALITY)
    }
}

impl FrameSampler {
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Canvas size for a tile: fixed width, height from the native aspect
    /// ratio. `None` when the stream has no decoded width yet.
    pub fn target_size(&self, native_width: u32, native_height: u32) -> Option<(u32, u32)> {
        if native_width == 0 {
            return None;
        }
        let aspect = native_height as f64 / native_width as f64;
        let height = (self.max_width as f64 * aspect) as u32;
        Some((self.max_width, height.max(1)))
    }

    /// Sample one tile. `Ok(None)` means the tile is skipped this cycle.
    pub fn sample<H: SurfaceHost + ?Sized>(
        &self,
        host: &H,
        participant_id: &ParticipantId,
        surface: &VideoSurface,
    ) -> Result<Option<SampledFrame>> {
        let Some((width, height)) = self.target_size(surface.native_width, surface.native_height)
        else {
            return Ok(None);
        };

        let frame = host
            .grab_frame(&surface.key)
            .with_context(|| format!("failed to grab frame for {participant_id}"))?;
        let image = self.encode(&frame, width, height)?;

        Ok(Some(SampledFrame {
            participant_id: participant_id.clone(),
            image,
        }))
    }

    /// Scale `frame` to `width`x`height` and encode it as a JPEG data URI.
    pub fn encode(&self, frame: &DynamicImage, width: u32, height: u32) -> Result<String> {
        let canvas = frame
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&canvas)
            .context("jpeg encoding failed")?;

        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)))
    }
}

//! File-backed host for running the monitor without a browser.
//!
//! A scene manifest describes the page: scroll offset plus one entry per video
//! element with its on-screen bounds and the image file holding its current
//! frame. An external grabber keeps the frame files and the manifest fresh;
//! every read goes back to disk so layout changes are picked up.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::models::{Rect, SurfaceKey, VideoSurface};

use super::SurfaceHost;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSurface {
    pub key: String,
    /// Frame image, relative to the manifest's directory.
    pub source: PathBuf,
    #[serde(default = "default_ready")]
    pub ready: bool,
    pub bounds: Rect,
}

fn default_ready() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub scroll: ScrollOffset,
    #[serde(default)]
    pub surfaces: Vec<SceneSurface>,
}

pub struct SceneHost {
    path: PathBuf,
    last: RwLock<SceneManifest>,
}

impl SceneHost {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last: RwLock::new(SceneManifest::default()),
        }
    }

    fn load(&self) -> Result<SceneManifest> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read scene {}", self.path.display()))?;
        let manifest: SceneManifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse scene {}", self.path.display()))?;

        if let Ok(mut guard) = self.last.write() {
            *guard = manifest.clone();
        }
        Ok(manifest)
    }

    /// Latest manifest, falling back to the last good read.
    fn current(&self) -> SceneManifest {
        match self.load() {
            Ok(manifest) => manifest,
            Err(err) => {
                log::debug!("scene reload failed, using cached layout: {err:#}");
                self.last
                    .read()
                    .map(|guard| guard.clone())
                    .unwrap_or_default()
            }
        }
    }

    fn resolve(&self, source: &Path) -> PathBuf {
        match self.path.parent() {
            Some(dir) if source.is_relative() => dir.join(source),
            _ => source.to_path_buf(),
        }
    }
}

impl SurfaceHost for SceneHost {
    fn surfaces(&self) -> Result<Vec<VideoSurface>> {
        let manifest = self.load()?;

        Ok(manifest
            .surfaces
            .into_iter()
            .map(|entry| {
                let (native_width, native_height) =
                    image::image_dimensions(self.resolve(&entry.source)).unwrap_or((0, 0));
                VideoSurface {
                    key: SurfaceKey::new(entry.key),
                    native_width,
                    native_height,
                    bounds: entry.bounds,
                    ready: entry.ready && native_width > 0,
                }
            })
            .collect())
    }

    fn scroll_offset(&self) -> (f64, f64) {
        let scroll = self.current().scroll;
        (scroll.x, scroll.y)
    }

    fn bounds(&self, key: &SurfaceKey) -> Option<Rect> {
        self.current()
            .surfaces
            .into_iter()
            .find(|entry| entry.key == key.as_str())
            .map(|entry| entry.bounds)
    }

    fn grab_frame(&self, key: &SurfaceKey) -> Result<DynamicImage> {
        let manifest = self.current();
        let entry = manifest
            .surfaces
            .iter()
            .find(|entry| entry.key == key.as_str())
            .ok_or_else(|| anyhow!("surface {key} is no longer in the scene"))?;
        let path = self.resolve(&entry.source);
        image::open(&path).with_context(|| format!("failed to read frame {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_scene(dir: &Path, width: f64) -> PathBuf {
        RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]))
            .save(dir.join("alice.png"))
            .unwrap();

        let manifest = serde_json::json!({
            "scroll": { "x": 0.0, "y": 250.0 },
            "surfaces": [
                { "key": "alice", "source": "alice.png", "bounds": { "left": 10.0, "top": 20.0, "width": width, "height": 180.0 } },
                { "key": "ghost", "source": "missing.png", "bounds": { "left": 0.0, "top": 0.0, "width": 320.0, "height": 180.0 } }
            ]
        });
        let path = dir.join("scene.json");
        fs::write(&path, manifest.to_string()).unwrap();
        path
    }

    #[test]
    fn reads_surfaces_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let host = SceneHost::new(write_scene(dir.path(), 320.0));

        let surfaces = host.surfaces().unwrap();
        assert_eq!(surfaces.len(), 2);
        assert_eq!((surfaces[0].native_width, surfaces[0].native_height), (64, 48));
        assert!(surfaces[0].ready);
        assert!(!surfaces[1].ready, "missing frame file means not decoded yet");

        let page = host.page_bounds(&SurfaceKey::new("alice")).unwrap();
        assert_eq!(page, Rect::new(10.0, 270.0, 320.0, 180.0));

        let frame = host.grab_frame(&SurfaceKey::new("alice")).unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn bounds_follow_manifest_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scene(dir.path(), 320.0);
        let host = SceneHost::new(path.clone());
        assert_eq!(host.bounds(&SurfaceKey::new("alice")).unwrap().width, 320.0);

        write_scene(dir.path(), 480.0);
        assert_eq!(host.bounds(&SurfaceKey::new("alice")).unwrap().width, 480.0);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let host = SceneHost::new(dir.path().join("nope.json"));
        assert!(host.surfaces().is_err());
        assert!(host.bounds(&SurfaceKey::new("alice")).is_none());
    }
}

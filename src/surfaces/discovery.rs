use chrono::Utc;
use std::collections::{HashMap, HashSet};

use crate::models::{ParticipantId, SurfaceKey, VideoSurface};

/// Default minimum rendered width and height for a tile to be sampled.
pub const MIN_VISIBLE_PX: f64 = 100.0;

/// Result of one discovery pass.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Ready, visible surfaces in document order, with their identities.
    pub eligible: Vec<(ParticipantId, VideoSurface)>,
    /// Identities whose element left the visual tree since the last pass.
    pub departed: Vec<ParticipantId>,
}

/// Maps host elements to participant identities for the whole session.
///
/// The host's elements are never tagged; identity lives here, keyed by the
/// element's [`SurfaceKey`].
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    by_key: HashMap<SurfaceKey, ParticipantId>,
    by_id: HashMap<ParticipantId, SurfaceKey>,
    last_stamp: i64,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discover(&mut self, surfaces: Vec<VideoSurface>, min_visible_px: f64) -> Discovery {
        let present: HashSet<&SurfaceKey> = surfaces.iter().map(|surface| &surface.key).collect();
        let departed_keys: Vec<SurfaceKey> = self
            .by_key
            .keys()
            .filter(|key| !present.contains(key))
            .cloned()
            .collect();

        let mut departed = Vec::with_capacity(departed_keys.len());
        for key in departed_keys {
            if let Some(id) = self.by_key.remove(&key) {
                self.by_id.remove(&id);
                departed.push(id);
            }
        }

        // One stamp per pass; strictly increasing so ids minted in separate
        // passes can never collide even within the same millisecond.
        let mut stamp: Option<i64> = None;
        let mut eligible = Vec::new();

        for (ordinal, surface) in surfaces.into_iter().enumerate() {
            if !is_eligible(&surface, min_visible_px) {
                continue;
            }

            let id = match self.by_key.get(&surface.key) {
                Some(id) => id.clone(),
                None => {
                    let stamp = *stamp.get_or_insert_with(|| self.next_stamp());
                    let id = ParticipantId::new(format!("participant-{stamp}-{ordinal}"));
                    self.by_key.insert(surface.key.clone(), id.clone());
                    self.by_id.insert(id.clone(), surface.key.clone());
                    id
                }
            };

            eligible.push((id, surface));
        }

        Discovery { eligible, departed }
    }

    pub fn key_for(&self, id: &ParticipantId) -> Option<&SurfaceKey> {
        self.by_id.get(id)
    }

    pub fn id_for(&self, key: &SurfaceKey) -> Option<&ParticipantId> {
        self.by_key.get(key)
    }

    fn next_stamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

/// Ready and large enough on screen to be worth sampling.
pub fn is_eligible(surface: &VideoSurface, min_visible_px: f64) -> bool {
    surface.ready && surface.bounds.exceeds(min_visible_px)
}

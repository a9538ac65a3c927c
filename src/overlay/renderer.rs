use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Judgment, ParticipantId, Rect};

use super::{OverlaySink, OverlayState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Owns one overlay per judged participant.
///
/// Updates are staged as they arrive and reach the sink in a single
/// [`present`](Self::present) call, so a cycle with many participants costs
/// one paint.
pub struct OverlayRenderer<S: OverlaySink> {
    overlays: BTreeMap<ParticipantId, OverlayState>,
    dirty: BTreeSet<ParticipantId>,
    sink: S,
}

impl<S: OverlaySink> OverlayRenderer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            overlays: BTreeMap::new(),
            dirty: BTreeSet::new(),
            sink,
        }
    }

    /// Create or update a participant's overlay from its latest judgment and
    /// the tile's current page-space bounds.
    pub fn stage(&mut self, participant_id: &ParticipantId, judgment: Judgment, bounds: Rect) {
        let overlay = OverlayState::new(participant_id.clone(), judgment, bounds);
        if self.overlays.get(participant_id) == Some(&overlay) {
            return;
        }
        self.overlays.insert(participant_id.clone(), overlay);
        self.dirty.insert(participant_id.clone());
    }

    /// Paint everything staged since the last call. Returns the batch size.
    pub fn present(&mut self) -> usize {
        if self.dirty.is_empty() {
            return 0;
        }

        let batch: Vec<OverlayState> = std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.overlays.get(&id).cloned())
            .collect();

        if let Err(err) = self.sink.paint(&batch) {
            log_error!("overlay paint failed: {err:#}");
        }
        log_debug!("painted {} overlays", batch.len());
        batch.len()
    }

    /// Drop overlays of participants whose tiles are gone.
    pub fn remove(&mut self, ids: &[ParticipantId]) {
        let removed: Vec<ParticipantId> = ids
            .iter()
            .filter(|id| {
                self.dirty.remove(*id);
                self.overlays.remove(*id).is_some()
            })
            .cloned()
            .collect();

        if removed.is_empty() {
            return;
        }
        if let Err(err) = self.sink.remove(&removed) {
            log_error!("overlay removal failed: {err:#}");
        }
    }

    /// Remove every overlay. Does nothing when none are drawn.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.overlays.clear();
        self.dirty.clear();
        if let Err(err) = self.sink.clear() {
            log_error!("overlay clear failed: {err:#}");
        }
    }

    pub fn get(&self, participant_id: &ParticipantId) -> Option<&OverlayState> {
        self.overlays.get(participant_id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn snapshot(&self) -> Vec<OverlayState> {
        self.overlays.values().cloned().collect()
    }
}

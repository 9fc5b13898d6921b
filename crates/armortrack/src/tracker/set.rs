//! The collection of live trackers and its per-frame lifecycle.
//!
//! One [`TrackSet::update`] call per frame:
//! 1. the [`Associator`] pairs live tracks with this frame's combos;
//! 2. matched tracks are updated, unmatched ones vanish once;
//! 3. tracks whose vanish counter reached the threshold are evicted;
//! 4. every unmatched combo starts a new track with a fresh identity.

use std::collections::{BTreeMap, BTreeSet};

use super::{anchor_of, GyroData, TrackSnapshot, Tracker, TrackerConfig};
use crate::combo::CompositeTarget;
use crate::vision;

/// Stable track identity. Never reused within a [`TrackSet`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub u64);

/// Pairs live tracks with the current frame's observations.
pub trait Associator {
    /// Return `(track, observation index)` pairs. Each track and each
    /// observation should appear at most once; extra pairs are ignored.
    fn associate(&self, tracks: &TrackSet, observations: &[CompositeTarget])
        -> Vec<(TrackId, usize)>;
}

/// Greedy nearest-anchor association with a size-relative distance gate.
///
/// Candidates must be of the same kind. Pairs are taken in order of
/// increasing distance, ties broken by track id and then observation index.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NearestCenter {
    /// Maximum anchor distance in units of the observation height.
    pub gate_ratio: f32,
}

impl Default for NearestCenter {
    fn default() -> Self {
        Self { gate_ratio: 3.0 }
    }
}

impl Associator for NearestCenter {
    fn associate(
        &self,
        tracks: &TrackSet,
        observations: &[CompositeTarget],
    ) -> Vec<(TrackId, usize)> {
        let mut candidates = Vec::new();
        for (id, tracker) in tracks.iter() {
            let anchor = tracker.anchor();
            for (j, obs) in observations.iter().enumerate() {
                if !tracker.accepts(obs) {
                    continue;
                }
                let d = vision::distance(anchor, anchor_of(obs));
                if d <= self.gate_ratio * obs.height.max(1.0) {
                    candidates.push((d, id, j));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut used_tracks = BTreeSet::new();
        let mut used_obs = BTreeSet::new();
        let mut pairs = Vec::new();
        for (_, id, j) in candidates {
            if used_tracks.contains(&id) || used_obs.contains(&j) {
                continue;
            }
            used_tracks.insert(id);
            used_obs.insert(j);
            pairs.push((id, j));
        }
        pairs
    }
}

/// Outcome of one [`TrackSet::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackUpdate {
    /// Tracks that received an observation.
    pub matched: Vec<TrackId>,
    /// Tracks that missed this frame and are still alive.
    pub vanished: Vec<TrackId>,
    /// Tracks removed after reaching the vanish threshold.
    pub removed: Vec<TrackId>,
    /// Tracks started from unmatched observations.
    pub spawned: Vec<TrackId>,
}

/// All live trackers, ordered by identity.
#[derive(Debug, Clone, Default)]
pub struct TrackSet {
    tracks: BTreeMap<TrackId, Tracker>,
    next_id: u64,
}

impl TrackSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// `true` when no track is alive.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Look up a track.
    pub fn get(&self, id: TrackId) -> Option<&Tracker> {
        self.tracks.get(&id)
    }

    /// Iterate live tracks in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &Tracker)> {
        self.tracks.iter().map(|(id, t)| (*id, t))
    }

    /// Identities of the live tracks in order.
    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.keys().copied().collect()
    }

    /// Serializable summaries of every live track.
    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.iter().map(|(id, t)| t.snapshot(id)).collect()
    }

    /// Run one frame of the track lifecycle.
    pub fn update(
        &mut self,
        observations: Vec<CompositeTarget>,
        gyro: &GyroData,
        tick: f64,
        config: &TrackerConfig,
        associator: &dyn Associator,
    ) -> TrackUpdate {
        let pairs = associator.associate(self, &observations);
        let mut slots: Vec<Option<CompositeTarget>> = observations.into_iter().map(Some).collect();
        let mut out = TrackUpdate::default();

        let mut matched = BTreeSet::new();
        for (id, j) in pairs {
            if matched.contains(&id) {
                continue;
            }
            let Some(tracker) = self.tracks.get_mut(&id) else {
                continue;
            };
            let Some(obs) = slots.get_mut(j).and_then(Option::take) else {
                continue;
            };
            if !tracker.accepts(&obs) {
                slots[j] = Some(obs);
                continue;
            }
            tracker.update(obs, tick, gyro, config);
            matched.insert(id);
        }
        out.matched = matched.iter().copied().collect();

        for (id, tracker) in self.tracks.iter_mut() {
            if matched.contains(id) {
                continue;
            }
            tracker.vanish(tick, config);
            if tracker.vanish_count() >= config.vanish_threshold {
                out.removed.push(*id);
            } else {
                out.vanished.push(*id);
            }
        }
        for id in &out.removed {
            self.tracks.remove(id);
        }

        for obs in slots.into_iter().flatten() {
            let id = TrackId(self.next_id);
            self.next_id += 1;
            self.tracks.insert(id, Tracker::new(obs, tick, gyro, config));
            out.spawned.push(id);
        }

        tracing::debug!(
            "tracks: {} matched, {} vanishing, {} removed, {} spawned, {} live",
            out.matched.len(),
            out.vanished.len(),
            out.removed.len(),
            out.spawned.len(),
            self.tracks.len()
        );
        out
    }
}

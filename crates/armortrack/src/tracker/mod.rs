//! Per-target temporal state.
//!
//! [`Tracker`] is a closed set of track kinds dispatched by `match`:
//! - [`GyroTracker`] follows a rigid multi-armor robot and fuses the gimbal
//!   yaw with the visual bearing to estimate its spin rate;
//! - [`RuneTracker`] follows a rotating rune panel and unwraps its angle
//!   across full turns.
//!
//! [`TrackSet`] owns all live trackers and runs association, vanish
//! counting and eviction once per frame.

mod gyro;
mod rune;
mod set;

pub use gyro::GyroTracker;
pub use rune::RuneTracker;
pub use set::{Associator, NearestCenter, TrackId, TrackSet, TrackUpdate};

use std::collections::VecDeque;

use crate::classify::RobotType;
use crate::combo::{ComboKind, CompositeTarget};
use crate::filter::FilterNoise;

/// Gimbal orientation reading supplied with each frame.
///
/// Angles are degrees, counter-clockwise positive seen from above (yaw) and
/// upwards positive (pitch). The tracker fuses the reading as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GyroData {
    /// Gimbal yaw in degrees.
    pub yaw: f32,
    /// Gimbal pitch in degrees.
    pub pitch: f32,
    /// Time of the reading in seconds.
    pub tick: f64,
}

/// Pinhole intrinsics used to turn pixel offsets into bearing angles.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Focal length along x (pixels).
    pub fx: f32,
    /// Focal length along y (pixels).
    pub fy: f32,
    /// Principal point x (pixels).
    pub cx: f32,
    /// Principal point y (pixels).
    pub cy: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: 1250.0,
            fy: 1250.0,
            cx: 640.0,
            cy: 512.0,
        }
    }
}

impl CameraConfig {
    /// Horizontal angle of a pixel from the optical axis, degrees,
    /// counter-clockwise (leftwards) positive.
    pub fn yaw_offset_deg(&self, x: f32) -> f32 {
        -((x - self.cx) / self.fx).atan().to_degrees()
    }

    /// Vertical angle of a pixel from the optical axis, degrees, upwards positive.
    pub fn pitch_offset_deg(&self, y: f32) -> f32 {
        -((y - self.cy) / self.fy).atan().to_degrees()
    }
}

/// Tracker lifecycle configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A track whose vanish counter reaches this value is evicted.
    pub vanish_threshold: u32,
    /// Number of combos kept in each track's history.
    pub history_len: usize,
    /// Number of recent non-unknown labels used for the label vote.
    pub label_history_len: usize,
    /// Number of raw angles kept by rune trackers.
    pub angle_history_len: usize,
    /// Lower bound of the sample time (seconds).
    pub min_sample_time: f32,
    /// Plates evenly spaced around a robot. Heading steps are folded into
    /// one plate spacing, so a switch to the neighbouring plate does not read
    /// as rotation. `1` disables the folding.
    pub armor_count: u32,
    /// Camera intrinsics for bearing computation.
    pub camera: CameraConfig,
    /// Heading/bearing/elevation filter noise.
    pub motion_noise: FilterNoise,
    /// Image-center filter noise.
    pub center_noise: FilterNoise,
    /// Facing/tilt filter noise.
    pub pose_noise: FilterNoise,
    /// Rune angle filter noise.
    pub rune_noise: FilterNoise,
}

impl TrackerConfig {
    /// Angular spacing between neighbouring plates, degrees.
    pub fn armor_spacing_deg(&self) -> f32 {
        360.0 / self.armor_count.max(1) as f32
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            vanish_threshold: 5,
            history_len: 32,
            label_history_len: 16,
            angle_history_len: 64,
            min_sample_time: 1e-3,
            armor_count: 4,
            camera: CameraConfig::default(),
            motion_noise: FilterNoise::new(400.0, 4.0, 100.0),
            center_noise: FilterNoise::new(2.0e4, 1.0, 100.0),
            pose_noise: FilterNoise::new(400.0, 9.0, 100.0),
            rune_noise: FilterNoise::new(100.0, 1.0, 100.0),
        }
    }
}

/// Lifecycle state of a live track. Evicted tracks no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Observed in the latest frame.
    Active,
    /// Missed at least the latest frame; outputs are stale predictions.
    Vanishing,
}

/// A tracked target of one of the known kinds.
#[derive(Debug, Clone)]
pub enum Tracker {
    /// Rigid multi-armor robot.
    Gyro(GyroTracker),
    /// Rotating rune panel.
    Rune(RuneTracker),
}

impl Tracker {
    /// Start a tracker of the kind matching `combo`.
    pub fn new(
        combo: CompositeTarget,
        tick: f64,
        gyro: &GyroData,
        config: &TrackerConfig,
    ) -> Self {
        match combo.kind {
            ComboKind::Armor { .. } => Self::Gyro(GyroTracker::new(combo, tick, gyro, config)),
            ComboKind::Rune { .. } => Self::Rune(RuneTracker::new(combo, tick, config)),
        }
    }

    /// Feed an associated observation.
    pub fn update(
        &mut self,
        combo: CompositeTarget,
        tick: f64,
        gyro: &GyroData,
        config: &TrackerConfig,
    ) {
        match self {
            Self::Gyro(t) => t.update(combo, tick, gyro, config),
            Self::Rune(t) => t.update(combo, tick, config),
        }
    }

    /// Advance without an observation.
    pub fn vanish(&mut self, tick: f64, config: &TrackerConfig) {
        match self {
            Self::Gyro(t) => t.vanish(tick, config),
            Self::Rune(t) => t.vanish(tick, config),
        }
    }

    /// `true` when `combo` is of the kind this tracker follows.
    pub fn accepts(&self, combo: &CompositeTarget) -> bool {
        matches!(
            (self, combo.kind),
            (Self::Gyro(_), ComboKind::Armor { .. }) | (Self::Rune(_), ComboKind::Rune { .. })
        )
    }

    /// Consecutive frames without an observation.
    pub fn vanish_count(&self) -> u32 {
        match self {
            Self::Gyro(t) => t.vanish_count(),
            Self::Rune(t) => t.vanish_count(),
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> TrackState {
        if self.vanish_count() == 0 {
            TrackState::Active
        } else {
            TrackState::Vanishing
        }
    }

    /// Observation history, most recent first.
    pub fn history(&self) -> &VecDeque<CompositeTarget> {
        match self {
            Self::Gyro(t) => t.history(),
            Self::Rune(t) => t.history(),
        }
    }

    /// Most recent combo (observed or, for runes, predicted).
    pub fn latest(&self) -> &CompositeTarget {
        match self {
            Self::Gyro(t) => t.latest(),
            Self::Rune(t) => t.latest(),
        }
    }

    /// Point used for association: plate center for armors, hub for runes.
    pub fn anchor(&self) -> [f32; 2] {
        anchor_of(self.latest())
    }

    /// Time since the previous update (seconds).
    pub fn sample_time(&self) -> f32 {
        match self {
            Self::Gyro(t) => t.sample_time(),
            Self::Rune(t) => t.sample_time(),
        }
    }

    /// Filtered rotation speed in degrees per second, counter-clockwise positive.
    pub fn rotation_speed(&self) -> f32 {
        match self {
            Self::Gyro(t) => t.rotation_speed(),
            Self::Rune(t) => t.rotation_speed(),
        }
    }

    /// Serializable summary of the current outputs.
    pub fn snapshot(&self, id: TrackId) -> TrackSnapshot {
        let latest = self.latest();
        let (kind, center, label, facing, elevation, total_angle, round) = match self {
            Self::Gyro(t) => (
                "gyro",
                t.center(),
                t.label(),
                Some(t.pose()[0]),
                Some(t.elevation()),
                None,
                None,
            ),
            Self::Rune(t) => (
                "rune",
                latest.center,
                RobotType::Unknown,
                None,
                None,
                Some(t.total_angle()),
                Some(t.round()),
            ),
        };
        TrackSnapshot {
            id,
            kind,
            state: self.state(),
            vanish_count: self.vanish_count(),
            center,
            label,
            rotation_speed: self.rotation_speed(),
            facing,
            elevation,
            total_angle,
            round,
            tick: latest.tick,
        }
    }
}

/// Serializable per-track output for the application layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrackSnapshot {
    /// Track identity.
    pub id: TrackId,
    /// `"gyro"` or `"rune"`.
    pub kind: &'static str,
    /// Lifecycle state.
    pub state: TrackState,
    /// Consecutive missed frames.
    pub vanish_count: u32,
    /// Filtered image center (armors) or latest panel center (runes).
    pub center: [f32; 2],
    /// Voted category label.
    pub label: RobotType,
    /// Filtered rotation speed (deg/s, counter-clockwise positive).
    pub rotation_speed: f32,
    /// Filtered plate facing (armors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<f32>,
    /// Filtered elevation of the plate above the horizon in degrees (armors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f32>,
    /// Round-counted angle (runes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_angle: Option<f32>,
    /// Completed turns (runes only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<i32>,
    /// Timestamp of the latest combo.
    pub tick: f64,
}

pub(crate) fn anchor_of(combo: &CompositeTarget) -> [f32; 2] {
    match combo.kind {
        ComboKind::Armor { .. } => combo.center,
        ComboKind::Rune { hub } => hub,
    }
}

/// Push to the front and drop from the back beyond `cap` (at least one kept).
pub(crate) fn push_bounded<T>(deque: &mut VecDeque<T>, value: T, cap: usize) {
    deque.push_front(value);
    deque.truncate(cap.max(1));
}

/// Sample time since `last_tick`, clamped from below.
pub(crate) fn sample_time(last_tick: f64, tick: f64, config: &TrackerConfig) -> f32 {
    ((tick - last_tick) as f32).max(config.min_sample_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn yaw_offset_is_leftwards_positive() {
        let cam = CameraConfig::default();
        assert_abs_diff_eq!(cam.yaw_offset_deg(cam.cx), 0.0);
        assert!(cam.yaw_offset_deg(cam.cx - 100.0) > 0.0);
        assert!(cam.yaw_offset_deg(cam.cx + 100.0) < 0.0);
        assert!(cam.pitch_offset_deg(cam.cy - 100.0) > 0.0);
    }

    #[test]
    fn armor_spacing_follows_plate_count() {
        let mut config = TrackerConfig::default();
        assert_abs_diff_eq!(config.armor_spacing_deg(), 90.0);
        config.armor_count = 3;
        assert_abs_diff_eq!(config.armor_spacing_deg(), 120.0);
        config.armor_count = 0;
        assert_abs_diff_eq!(config.armor_spacing_deg(), 360.0);
    }

    #[test]
    fn bounded_push_keeps_most_recent_first() {
        let mut d = VecDeque::new();
        for i in 0..5 {
            push_bounded(&mut d, i, 3);
        }
        assert_eq!(d.iter().copied().collect::<Vec<_>>(), vec![4, 3, 2]);
    }
}

//! Tracker for a rotating rune panel.
//!
//! Raw panel angles live in `(-180, 180]`. A jump of more than half a turn
//! between consecutive angles is read as a wrap, which advances the round
//! counter so the total angle stays continuous.

use std::collections::VecDeque;

use nalgebra::{Vector1, Vector2};

use super::{push_bounded, sample_time, TrackerConfig};
use crate::combo::{ComboKind, CompositeTarget};
use crate::filter::Kf21;

/// Temporal state of one rune panel.
#[derive(Debug, Clone)]
pub struct RuneTracker {
    latest: CompositeTarget,
    history: VecDeque<CompositeTarget>,
    vanish_count: u32,
    last_tick: f64,
    sample_time: f32,
    round: i32,
    angles: VecDeque<f32>,
    total_angle: f32,
    /// `[total_angle, angular_rate]`.
    filter: Kf21,
    rotation_speed: f32,
}

impl RuneTracker {
    /// Start tracking from a first rune observation.
    pub fn new(combo: CompositeTarget, tick: f64, config: &TrackerConfig) -> Self {
        let mut history = VecDeque::new();
        history.push_front(combo.clone());
        let mut angles = VecDeque::new();
        angles.push_front(combo.angle);
        Self {
            history,
            vanish_count: 0,
            last_tick: tick,
            sample_time: 0.0,
            round: 0,
            angles,
            total_angle: combo.angle,
            filter: Kf21::observing_values(Vector2::new(combo.angle, 0.0), config.rune_noise),
            rotation_speed: 0.0,
            latest: combo,
        }
    }

    /// Fuse an associated rune observation.
    pub fn update(&mut self, combo: CompositeTarget, tick: f64, config: &TrackerConfig) {
        let dt = sample_time(self.last_tick, tick, config);
        let total = self.unwrap_angle(combo.angle, config);

        self.filter.predict(dt);
        let x = self.filter.correct(&Vector1::new(total));
        self.rotation_speed = x[1];

        tracing::trace!(
            "rune track: raw {:.2} total {:.2} round {} rate {:.2} deg/s",
            combo.angle,
            total,
            self.round,
            self.rotation_speed
        );

        push_bounded(&mut self.history, combo.clone(), config.history_len);
        self.latest = combo;
        self.vanish_count = 0;
        self.last_tick = tick;
        self.sample_time = dt;
    }

    /// Advance without an observation.
    ///
    /// The filter prediction becomes the new total angle; it is split back
    /// into round and raw angle, and the latest combo is rotated about the hub
    /// to match. The rotation speed keeps its last value.
    pub fn vanish(&mut self, tick: f64, config: &TrackerConfig) {
        let dt = sample_time(self.last_tick, tick, config);
        let predicted = self.filter.predict(dt)[0];

        let (round, raw) = split_total(predicted);
        self.round = round;
        self.total_angle = predicted;
        push_bounded(&mut self.angles, raw, config.angle_history_len);

        let moved = rotate_about_hub(&self.latest, raw, tick);
        push_bounded(&mut self.history, moved.clone(), config.history_len);
        self.latest = moved;

        self.vanish_count += 1;
        self.last_tick = tick;
        self.sample_time = dt;
    }

    /// Record a raw angle and return the round-counted total.
    fn unwrap_angle(&mut self, raw: f32, config: &TrackerConfig) -> f32 {
        if let Some(&prev) = self.angles.front() {
            let delta = raw - prev;
            if delta > 180.0 {
                self.round -= 1;
            } else if delta < -180.0 {
                self.round += 1;
            }
        }
        push_bounded(&mut self.angles, raw, config.angle_history_len);
        self.total_angle = self.round as f32 * 360.0 + raw;
        self.total_angle
    }

    /// Consecutive frames without an observation.
    pub fn vanish_count(&self) -> u32 {
        self.vanish_count
    }

    /// Combos (observed or predicted), most recent first.
    pub fn history(&self) -> &VecDeque<CompositeTarget> {
        &self.history
    }

    /// Most recent combo.
    pub fn latest(&self) -> &CompositeTarget {
        &self.latest
    }

    /// Time between the last two updates (seconds).
    pub fn sample_time(&self) -> f32 {
        self.sample_time
    }

    /// Filtered angular rate (deg/s, counter-clockwise positive).
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// Completed turns.
    pub fn round(&self) -> i32 {
        self.round
    }

    /// Raw angles, most recent first.
    pub fn angles(&self) -> &VecDeque<f32> {
        &self.angles
    }

    /// `round * 360 + raw` of the latest angle.
    pub fn total_angle(&self) -> f32 {
        self.total_angle
    }
}

/// Split a continuous angle into `(round, raw)` with `raw` in `(-180, 180]`.
fn split_total(total: f32) -> (i32, f32) {
    let mut round = ((total + 180.0) / 360.0).floor() as i32;
    let mut raw = total - round as f32 * 360.0;
    if raw <= -180.0 {
        raw += 360.0;
        round -= 1;
    }
    (round, raw)
}

/// Copy of a rune combo with the panel moved to `angle` around its hub.
fn rotate_about_hub(combo: &CompositeTarget, angle: f32, tick: f64) -> CompositeTarget {
    let ComboKind::Rune { hub } = combo.kind else {
        return combo.with_tick(tick);
    };
    let (sin, cos) = (angle - combo.angle).to_radians().sin_cos();
    // Counter-clockwise on screen with image y pointing down.
    let rotate = |p: [f32; 2]| {
        let (dx, dy) = (p[0] - hub[0], p[1] - hub[1]);
        [hub[0] + dx * cos + dy * sin, hub[1] - dx * sin + dy * cos]
    };
    let mut moved = combo.with_tick(tick);
    moved.center = rotate(combo.center);
    moved.corners = combo.corners.map(rotate);
    moved.angle = angle;
    moved
}

//! Tracker for a spinning multi-armor robot.
//!
//! The visual bearing of the plate (gimbal yaw plus the pixel offset from
//! the optical axis) and its heading (bearing plus plate facing) are
//! differentiated between observations and fused in a 4-state filter.
//! The filtered heading rate is the robot's rotation speed.
//!
//! Heading steps are folded into one plate spacing. When the observed plate
//! turns away and its neighbour takes over, the facing jumps by a whole
//! spacing; folding keeps the heading continuous across the switch, and the
//! per-plate states (center, facing, bearing) are re-anchored on the new
//! plate.

use std::collections::{BTreeMap, VecDeque};

use nalgebra::{Vector1, Vector2, Vector4};

use super::{push_bounded, sample_time, GyroData, TrackerConfig};
use crate::classify::RobotType;
use crate::combo::CompositeTarget;
use crate::filter::{Kf21, Kf42, Kf44};

/// Temporal state of one armor-plated robot.
#[derive(Debug, Clone)]
pub struct GyroTracker {
    latest: CompositeTarget,
    history: VecDeque<CompositeTarget>,
    labels: VecDeque<RobotType>,
    label: RobotType,
    vanish_count: u32,
    last_tick: f64,
    sample_time: f32,
    measured_tick: f64,
    measured_heading: f32,
    measured_bearing: f32,
    /// `[heading, heading_rate, bearing, bearing_rate]`, all observed.
    motion: Kf44,
    /// `[x, vx, y, vy]` image center.
    center: Kf42,
    /// `[facing, facing_rate, tilt, tilt_rate]`.
    pose: Kf42,
    /// `[elevation, elevation_rate]` from gimbal pitch and image row.
    elevation: Kf21,
    center_out: [f32; 2],
    pose_out: [f32; 2],
    rotation_speed: f32,
}

impl GyroTracker {
    /// Start tracking from a first armor observation.
    pub fn new(
        combo: CompositeTarget,
        tick: f64,
        gyro: &GyroData,
        config: &TrackerConfig,
    ) -> Self {
        let (bearing, heading) = measure(&combo, gyro, config);
        let elevation = measure_elevation(&combo, gyro, config);
        let mut labels = VecDeque::new();
        if combo.label != RobotType::Unknown {
            labels.push_front(combo.label);
        }
        let mut history = VecDeque::new();
        history.push_front(combo.clone());

        Self {
            label: combo.label,
            labels,
            history,
            vanish_count: 0,
            last_tick: tick,
            sample_time: 0.0,
            measured_tick: tick,
            measured_heading: heading,
            measured_bearing: bearing,
            motion: Kf44::observing_all(
                Vector4::new(heading, 0.0, bearing, 0.0),
                config.motion_noise,
            ),
            center: Kf42::observing_values(
                Vector4::new(combo.center[0], 0.0, combo.center[1], 0.0),
                config.center_noise,
            ),
            pose: Kf42::observing_values(
                Vector4::new(combo.facing, 0.0, combo.angle, 0.0),
                config.pose_noise,
            ),
            elevation: Kf21::observing_values(Vector2::new(elevation, 0.0), config.motion_noise),
            center_out: combo.center,
            pose_out: [combo.facing, combo.angle],
            rotation_speed: 0.0,
            latest: combo,
        }
    }

    /// Fuse an associated armor observation.
    pub fn update(
        &mut self,
        combo: CompositeTarget,
        tick: f64,
        gyro: &GyroData,
        config: &TrackerConfig,
    ) {
        let dt = sample_time(self.last_tick, tick, config);
        let elapsed = sample_time(self.measured_tick, tick, config);

        let (bearing, heading) = measure(&combo, gyro, config);
        let spacing = config.armor_spacing_deg();
        // Keep both angles continuous with the previous measurement.
        let raw_step = wrap_deg(heading - self.measured_heading);
        let heading_step = fold_deg(raw_step, spacing);
        let switched = (raw_step - heading_step).abs() > 0.5 * spacing;
        let heading = self.measured_heading + heading_step;
        let bearing = self.measured_bearing + wrap_deg(bearing - self.measured_bearing);
        let heading_rate = heading_step / elapsed;

        self.motion.predict(dt);
        self.center.predict(dt);
        self.pose.predict(dt);
        self.elevation.predict(dt);

        let bearing_rate = if switched {
            tracing::debug!(
                "gyro track at {:?}: plate switch, facing {:.1} -> {:.1}",
                self.center_out,
                self.pose_out[0],
                combo.facing
            );
            self.reanchor(&combo, bearing);
            self.motion.state()[3]
        } else {
            (bearing - self.measured_bearing) / elapsed
        };

        let motion = self
            .motion
            .correct(&Vector4::new(heading, heading_rate, bearing, bearing_rate));
        let center = self.center.correct(&Vector2::new(combo.center[0], combo.center[1]));
        let pose = self.pose.correct(&Vector2::new(combo.facing, combo.angle));
        self.elevation.correct(&Vector1::new(measure_elevation(&combo, gyro, config)));

        self.rotation_speed = motion[1];
        self.center_out = [center[0], center[2]];
        self.pose_out = [pose[0], pose[2]];

        if combo.label != RobotType::Unknown {
            push_bounded(&mut self.labels, combo.label, config.label_history_len);
            self.label = vote(&self.labels);
        }

        tracing::trace!(
            "gyro track at {:?}: heading {:.2} rate {:.2} deg/s",
            self.center_out,
            motion[0],
            self.rotation_speed
        );

        push_bounded(&mut self.history, combo.clone(), config.history_len);
        self.latest = combo;
        self.vanish_count = 0;
        self.last_tick = tick;
        self.sample_time = dt;
        self.measured_tick = tick;
        self.measured_heading = heading;
        self.measured_bearing = bearing;
    }

    /// Move the per-plate states onto a newly observed plate, keeping rates.
    fn reanchor(&mut self, combo: &CompositeTarget, bearing: f32) {
        let m = *self.motion.state();
        self.motion.set_state(Vector4::new(m[0], m[1], bearing, m[3]));
        let c = *self.center.state();
        self.center.set_state(Vector4::new(combo.center[0], c[1], combo.center[1], c[3]));
        let p = *self.pose.state();
        self.pose.set_state(Vector4::new(combo.facing, p[1], combo.angle, p[3]));
    }

    /// Advance the filters without an observation. Outputs keep their last values.
    pub fn vanish(&mut self, tick: f64, config: &TrackerConfig) {
        let dt = sample_time(self.last_tick, tick, config);
        self.motion.predict(dt);
        self.center.predict(dt);
        self.pose.predict(dt);
        self.elevation.predict(dt);
        self.vanish_count += 1;
        self.last_tick = tick;
        self.sample_time = dt;
    }

    /// Consecutive frames without an observation.
    pub fn vanish_count(&self) -> u32 {
        self.vanish_count
    }

    /// Observed combos, most recent first.
    pub fn history(&self) -> &VecDeque<CompositeTarget> {
        &self.history
    }

    /// Most recent observed combo.
    pub fn latest(&self) -> &CompositeTarget {
        &self.latest
    }

    /// Time between the last two updates (seconds).
    pub fn sample_time(&self) -> f32 {
        self.sample_time
    }

    /// Filtered heading rate (deg/s, counter-clockwise positive).
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// Filtered image center.
    pub fn center(&self) -> [f32; 2] {
        self.center_out
    }

    /// Filtered `[facing, tilt]` in degrees.
    pub fn pose(&self) -> [f32; 2] {
        self.pose_out
    }

    /// Filtered `[heading, bearing]` in degrees, propagated through vanishes.
    pub fn motion(&self) -> [f32; 2] {
        let x = self.motion.state();
        [x[0], x[2]]
    }

    /// Filtered elevation above the horizon (degrees, upwards positive).
    pub fn elevation(&self) -> f32 {
        self.elevation.state()[0]
    }

    /// Majority label over the recent non-unknown labels.
    pub fn label(&self) -> RobotType {
        self.label
    }
}

/// Plan-view `(bearing, heading)` of an armor observation, degrees.
fn measure(combo: &CompositeTarget, gyro: &GyroData, config: &TrackerConfig) -> (f32, f32) {
    let bearing = gyro.yaw + config.camera.yaw_offset_deg(combo.center[0]);
    (bearing, bearing + combo.facing)
}

/// Vertical angle of an armor observation above the horizon, degrees.
fn measure_elevation(combo: &CompositeTarget, gyro: &GyroData, config: &TrackerConfig) -> f32 {
    gyro.pitch + config.camera.pitch_offset_deg(combo.center[1])
}

/// Wrap an angle difference into `(-180, 180]`.
fn wrap_deg(delta: f32) -> f32 {
    fold_deg(delta, 360.0)
}

/// Fold an angle difference into `(-period / 2, period / 2]`.
fn fold_deg(delta: f32, period: f32) -> f32 {
    let half = 0.5 * period;
    let folded = (delta + half).rem_euclid(period) - half;
    if folded <= -half {
        folded + period
    } else {
        folded
    }
}

/// Most frequent label; ties go to the most recently seen one.
fn vote(labels: &VecDeque<RobotType>) -> RobotType {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(*label).or_insert(0usize) += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);
    labels
        .iter()
        .copied()
        .find(|l| counts.get(l) == Some(&best))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combo::{Armor, ArmorRules};
    use crate::test_utils::blob;
    use approx::assert_abs_diff_eq;

    fn armor_at(x: f32, tick: f64) -> CompositeTarget {
        let l = blob([x - 30.0, 512.0], 7.0, 29.0, 0.0, 0);
        let r = blob([x + 30.0, 512.0], 7.0, 29.0, 0.0, 1);
        Armor::make(&l, &r, 0, 1, &ArmorRules::default(), tick).expect("compatible")
    }

    #[test]
    fn wrap_deg_stays_in_half_open_range() {
        assert_abs_diff_eq!(wrap_deg(350.0), -10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_deg(-350.0), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_deg(180.0), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(wrap_deg(-180.0), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(fold_deg(-89.1, 90.0), 0.9, epsilon = 1e-4);
        assert_abs_diff_eq!(fold_deg(89.1, 90.0), -0.9, epsilon = 1e-4);
        assert_abs_diff_eq!(fold_deg(-45.0, 90.0), 45.0, epsilon = 1e-4);
    }

    #[test]
    fn vote_prefers_majority_then_recency() {
        let labels: VecDeque<_> = [RobotType::Hero, RobotType::Sentry, RobotType::Sentry]
            .into_iter()
            .collect();
        assert_eq!(vote(&labels), RobotType::Sentry);

        let tie: VecDeque<_> = [RobotType::Hero, RobotType::Sentry].into_iter().collect();
        assert_eq!(vote(&tie), RobotType::Hero);
        assert_eq!(vote(&VecDeque::new()), RobotType::Unknown);
    }

    #[test]
    fn static_target_has_zero_rotation_speed() {
        let config = TrackerConfig::default();
        let gyro = GyroData::default();
        let x = config.camera.cx;
        let mut t = GyroTracker::new(armor_at(x, 0.0), 0.0, &gyro, &config);
        for k in 1..=20 {
            let tick = k as f64 * 0.01;
            t.update(armor_at(x, tick), tick, &gyro, &config);
        }
        assert_abs_diff_eq!(t.rotation_speed(), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(t.center()[0], x, epsilon = 1e-2);
        assert_abs_diff_eq!(t.sample_time(), 0.01, epsilon = 1e-5);
    }

    #[test]
    fn gimbal_pan_is_compensated() {
        // The gimbal pans at 10 deg/s while the target stays put in the world,
        // so it drifts across the image and the bearing stays at zero.
        let config = TrackerConfig::default();
        let cam = config.camera;
        let sample = |k: u32| {
            let tick = k as f64 * 0.01;
            let yaw = 0.1 * k as f32;
            let x = cam.cx + cam.fx * yaw.to_radians().tan();
            (armor_at(x, tick), GyroData { yaw, pitch: 0.0, tick }, tick)
        };
        let (combo, gyro, tick) = sample(0);
        let mut t = GyroTracker::new(combo, tick, &gyro, &config);
        for k in 1..=50 {
            let (combo, gyro, tick) = sample(k);
            t.update(combo, tick, &gyro, &config);
        }
        assert_abs_diff_eq!(t.rotation_speed(), 0.0, epsilon = 0.5);
        assert_abs_diff_eq!(t.motion()[1], 0.0, epsilon = 0.05);
    }

    #[test]
    fn spinning_plate_recovers_rotation_speed() {
        let config = TrackerConfig::default();
        let gyro = GyroData::default();
        let x = config.camera.cx;
        let mut first = armor_at(x, 0.0);
        first.facing = -45.0;
        let mut t = GyroTracker::new(first, 0.0, &gyro, &config);
        for k in 1..=100 {
            let tick = k as f64 * 0.01;
            let mut combo = armor_at(x, tick);
            combo.facing = 0.9 * k as f32 - 45.0;
            t.update(combo, tick, &gyro, &config);
        }
        assert_abs_diff_eq!(t.rotation_speed(), 90.0, epsilon = 1.0);
    }

    #[test]
    fn rotation_speed_survives_plate_switches() {
        // Four plates spinning at 90 deg/s: the facing ramps through one
        // plate spacing, then the neighbouring plate takes over.
        let config = TrackerConfig::default();
        let gyro = GyroData::default();
        let x = config.camera.cx;
        for dir in [1.0f32, -1.0] {
            let facing = |k: u32| fold_deg(dir * 0.9 * k as f32, 90.0);
            let mut t = GyroTracker::new(armor_at(x, 0.0), 0.0, &gyro, &config);
            let mut switches = 0;
            for k in 1..=300 {
                let tick = k as f64 * 0.01;
                let mut combo = armor_at(x, tick);
                combo.facing = facing(k);
                if (combo.facing - facing(k - 1)).abs() > 45.0 {
                    switches += 1;
                }
                t.update(combo, tick, &gyro, &config);
                if k >= 100 {
                    assert_abs_diff_eq!(t.rotation_speed(), 90.0 * dir, epsilon = 2.0);
                }
            }
            assert_eq!(switches, 3);
            assert_abs_diff_eq!(t.pose()[0], facing(300), epsilon = 1.0);
            assert_abs_diff_eq!(t.center()[0], x, epsilon = 1e-2);
        }
    }

    #[test]
    fn elevation_fuses_gimbal_pitch() {
        let config = TrackerConfig::default();
        let cam = config.camera;
        // The gimbal tilts up at 10 deg/s while the target holds still at
        // 3 degrees above the horizon, so it slides down the image.
        let sample = |k: u32| {
            let tick = k as f64 * 0.01;
            let pitch = 0.1 * k as f32;
            let mut combo = armor_at(cam.cx, tick);
            combo.center[1] = cam.cy + cam.fy * (pitch - 3.0).to_radians().tan();
            (combo, GyroData { yaw: 0.0, pitch, tick }, tick)
        };
        let (combo, gyro, tick) = sample(0);
        let mut t = GyroTracker::new(combo, tick, &gyro, &config);
        assert_abs_diff_eq!(t.elevation(), 3.0, epsilon = 1e-3);
        for k in 1..=50 {
            let (combo, gyro, tick) = sample(k);
            t.update(combo, tick, &gyro, &config);
        }
        assert_abs_diff_eq!(t.elevation(), 3.0, epsilon = 0.05);
    }

    #[test]
    fn vanish_keeps_outputs_and_counts() {
        let config = TrackerConfig::default();
        let gyro = GyroData::default();
        let mut t = GyroTracker::new(armor_at(600.0, 0.0), 0.0, &gyro, &config);
        t.update(armor_at(602.0, 0.01), 0.01, &gyro, &config);
        let (center, speed) = (t.center(), t.rotation_speed());

        t.vanish(0.02, &config);
        t.vanish(0.03, &config);
        assert_eq!(t.vanish_count(), 2);
        assert_eq!(t.center(), center);
        assert_eq!(t.rotation_speed(), speed);
        assert_eq!(t.history().len(), 2);

        t.update(armor_at(606.0, 0.04), 0.04, &gyro, &config);
        assert_eq!(t.vanish_count(), 0);
    }

    #[test]
    fn labels_are_voted() {
        let config = TrackerConfig::default();
        let gyro = GyroData::default();
        let labelled = |label, tick| {
            let mut c = armor_at(640.0, tick);
            c.label = label;
            c
        };
        let mut t = GyroTracker::new(labelled(RobotType::Hero, 0.0), 0.0, &gyro, &config);
        t.update(labelled(RobotType::Unknown, 0.01), 0.01, &gyro, &config);
        assert_eq!(t.label(), RobotType::Hero);
        t.update(labelled(RobotType::Infantry3, 0.02), 0.02, &gyro, &config);
        t.update(labelled(RobotType::Infantry3, 0.03), 0.03, &gyro, &config);
        assert_eq!(t.label(), RobotType::Infantry3);
    }
}

//! Armor plate construction from a light-bar pair.

use super::{ArmorSize, ComboKind, CompositeTarget};
use crate::classify::RobotType;
use crate::feature::LightBlob;
use crate::vision;

/// Geometric compatibility rules for pairing two light bars.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArmorRules {
    /// Maximum tilt difference between the two bars (degrees).
    pub max_tilt_diff_deg: f32,
    /// Minimum bar elongation `height / width`.
    pub min_aspect_ratio: f32,
    /// Maximum bar elongation `height / width`.
    pub max_aspect_ratio: f32,
    /// Maximum ratio between the longer and the shorter bar.
    pub max_length_ratio: f32,
    /// Minimum baseline length over mean bar length.
    pub min_baseline_ratio: f32,
    /// Maximum baseline length over mean bar length.
    pub max_baseline_ratio: f32,
    /// Maximum deviation of the baseline from the bars' normal (degrees).
    pub max_baseline_tilt_deg: f32,
    /// Baseline ratio above which the plate is classified as big.
    pub big_armor_ratio: f32,
    /// Frontal baseline ratio of a small plate.
    pub small_nominal_ratio: f32,
    /// Frontal baseline ratio of a big plate.
    pub big_nominal_ratio: f32,
}

impl Default for ArmorRules {
    fn default() -> Self {
        Self {
            max_tilt_diff_deg: 10.0,
            min_aspect_ratio: 1.5,
            max_aspect_ratio: 15.0,
            max_length_ratio: 1.6,
            min_baseline_ratio: 1.0,
            max_baseline_ratio: 5.5,
            max_baseline_tilt_deg: 20.0,
            big_armor_ratio: 3.2,
            small_nominal_ratio: 2.35,
            big_nominal_ratio: 4.1,
        }
    }
}

/// Relative bar-length difference below which a plate is considered frontal.
const FRONTAL_LENGTH_TOLERANCE: f32 = 0.02;

/// Armor construction rule.
pub struct Armor;

impl Armor {
    /// Pair `left` and `right` into an armor combo.
    ///
    /// Returns `None` when the pair is incompatible under `rules` or when
    /// `left` is not strictly left of `right`.
    pub fn make(
        left: &LightBlob,
        right: &LightBlob,
        left_id: usize,
        right_id: usize,
        rules: &ArmorRules,
        tick: f64,
    ) -> Option<CompositeTarget> {
        if left.center[0] >= right.center[0] {
            return None;
        }

        let tilt_gap = tilt_delta(left.angle, right.angle);
        let tilt_diff = tilt_gap.abs();
        if tilt_diff > rules.max_tilt_diff_deg {
            return None;
        }

        let aspect_ok = |b: &LightBlob| {
            let a = b.aspect_ratio();
            a >= rules.min_aspect_ratio && a <= rules.max_aspect_ratio
        };
        if !aspect_ok(left) || !aspect_ok(right) {
            return None;
        }

        let (long, short) = if left.height >= right.height {
            (left.height, right.height)
        } else {
            (right.height, left.height)
        };
        let length_ratio = long / short.max(f32::EPSILON);
        if length_ratio > rules.max_length_ratio {
            return None;
        }

        let mean_height = 0.5 * (left.height + right.height);
        let baseline = vision::distance(left.center, right.center);
        let baseline_ratio = baseline / mean_height.max(f32::EPSILON);
        if baseline_ratio < rules.min_baseline_ratio || baseline_ratio > rules.max_baseline_ratio {
            return None;
        }

        let mean_tilt = tilt_delta(right.angle + 0.5 * tilt_gap, 0.0);
        let baseline_angle = (right.center[1] - left.center[1])
            .atan2(right.center[0] - left.center[0])
            .to_degrees();
        let baseline_tilt = tilt_delta(baseline_angle, mean_tilt).abs();
        if baseline_tilt > rules.max_baseline_tilt_deg {
            return None;
        }

        let error = tilt_diff / rules.max_tilt_diff_deg.max(f32::EPSILON)
            + (length_ratio - 1.0) / (rules.max_length_ratio - 1.0).max(f32::EPSILON)
            + baseline_tilt / rules.max_baseline_tilt_deg.max(f32::EPSILON);

        let size = if baseline_ratio > rules.big_armor_ratio {
            ArmorSize::Big
        } else {
            ArmorSize::Small
        };
        let nominal = match size {
            ArmorSize::Small => rules.small_nominal_ratio,
            ArmorSize::Big => rules.big_nominal_ratio,
        };
        let facing = facing_deg(left.height, right.height, baseline_ratio / nominal);

        let (left_top, left_bottom) = left.endpoints();
        let (right_top, right_bottom) = right.endpoints();

        Some(CompositeTarget {
            kind: ComboKind::Armor { size },
            features: vec![*left, *right],
            feature_ids: vec![left_id, right_id],
            center: [
                0.5 * (left.center[0] + right.center[0]),
                0.5 * (left.center[1] + right.center[1]),
            ],
            width: baseline,
            height: mean_height,
            angle: mean_tilt,
            corners: [left_bottom, left_top, right_top, right_bottom],
            label: RobotType::Unknown,
            error,
            facing,
            tick,
        })
    }

    /// `true` when the blob center lies strictly inside the armor quadrilateral.
    pub fn contains_blob(blob: &LightBlob, armor: &CompositeTarget) -> bool {
        vision::polygon_contains(&armor.corners, blob.center)
    }
}

/// Signed difference of two line tilts, degrees in `(-90, 90]`.
///
/// Tilts of `90` and `-90` describe the same horizontal line.
fn tilt_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(180.0);
    if d > 90.0 {
        d - 180.0
    } else {
        d
    }
}

/// Plan-view rotation of the plate from its foreshortening.
///
/// The apparent baseline shrinks with `cos(facing)`; the nearer bar looks
/// longer, which fixes the sign (left bar nearer means counter-clockwise).
fn facing_deg(left_height: f32, right_height: f32, foreshortening: f32) -> f32 {
    let mean = 0.5 * (left_height + right_height);
    let rel = (left_height - right_height) / mean.max(f32::EPSILON);
    if rel.abs() < FRONTAL_LENGTH_TOLERANCE {
        return 0.0;
    }
    let magnitude = foreshortening.clamp(0.0, 1.0).acos().to_degrees();
    magnitude.copysign(rel)
}

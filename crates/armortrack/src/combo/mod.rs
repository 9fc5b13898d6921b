//! Composite targets ("combos") assembled from primitive features.
//!
//! A combo owns copies of its constituent [`LightBlob`]s together with their
//! indices in the producing frame, so trackers can keep a combo after the
//! frame buffers are gone.

mod armor;

pub use armor::{Armor, ArmorRules};

use crate::classify::RobotType;
use crate::feature::LightBlob;

/// Physical size class of an armor plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorSize {
    /// Standard plate.
    Small,
    /// Wide plate (hero, base, balance infantry).
    Big,
}

/// Kind-specific part of a combo.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComboKind {
    /// Armor plate built from a left/right light-bar pair.
    Armor {
        /// Plate size class.
        size: ArmorSize,
    },
    /// Rotating rune panel built from a panel blob and the hub blob.
    Rune {
        /// Rotation hub center in image pixels.
        hub: [f32; 2],
    },
}

/// A composite target observed in one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeTarget {
    /// Kind and kind-specific attributes.
    pub kind: ComboKind,
    /// Constituent features; `[left, right]` for armors, `[panel, hub]` for runes.
    pub features: Vec<LightBlob>,
    /// Indices of `features` in the producing frame's blob list.
    ///
    /// Only meaningful inside that frame (used for conflict resolution).
    pub feature_ids: Vec<usize>,
    /// Center in image pixels.
    pub center: [f32; 2],
    /// Width in pixels (baseline length for armors).
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Orientation in degrees: mean bar tilt for armors, hub→panel direction
    /// (counter-clockwise positive, `(-180, 180]`) for runes.
    pub angle: f32,
    /// Corners: left-bottom, left-top, right-top, right-bottom.
    pub corners: [[f32; 2]; 4],
    /// Category label assigned by the classifier.
    pub label: RobotType,
    /// Fit-error score, lower is better.
    pub error: f32,
    /// Rotation of the plate about the vertical axis relative to the line of
    /// sight, degrees, counter-clockwise positive in plan view.
    pub facing: f32,
    /// Capture time in seconds.
    pub tick: f64,
}

impl CompositeTarget {
    /// Build a rune combo from the lit panel and the rotation hub.
    pub fn rune(
        panel: LightBlob,
        hub: LightBlob,
        panel_id: usize,
        hub_id: usize,
        tick: f64,
    ) -> Self {
        let dx = panel.center[0] - hub.center[0];
        let dy = panel.center[1] - hub.center[1];
        // Image y points down; flip it so counter-clockwise is positive.
        let mut angle = (-dy).atan2(dx).to_degrees();
        if angle <= -180.0 {
            angle += 360.0;
        }

        let (top, bottom) = panel.endpoints();
        let [nx, ny] = {
            let [ux, uy] = panel.axis();
            [-uy, ux]
        };
        let half_w = 0.5 * panel.width;
        let corners = [
            [bottom[0] - nx * half_w, bottom[1] - ny * half_w],
            [top[0] - nx * half_w, top[1] - ny * half_w],
            [top[0] + nx * half_w, top[1] + ny * half_w],
            [bottom[0] + nx * half_w, bottom[1] + ny * half_w],
        ];

        Self {
            kind: ComboKind::Rune { hub: hub.center },
            features: vec![panel, hub],
            feature_ids: vec![panel_id, hub_id],
            center: panel.center,
            width: panel.width,
            height: panel.height,
            angle,
            corners,
            label: RobotType::Unknown,
            error: 0.0,
            facing: 0.0,
            tick,
        }
    }

    /// Copy of this combo re-stamped with `tick`.
    pub fn with_tick(&self, tick: f64) -> Self {
        Self {
            tick,
            ..self.clone()
        }
    }

    /// Frame index of the left constituent.
    pub fn left_id(&self) -> Option<usize> {
        self.feature_ids.first().copied()
    }

    /// Frame index of the right constituent.
    pub fn right_id(&self) -> Option<usize> {
        self.feature_ids.get(1).copied()
    }

    /// `true` for armor combos.
    pub fn is_armor(&self) -> bool {
        matches!(self.kind, ComboKind::Armor { .. })
    }

    /// `true` for rune combos.
    pub fn is_rune(&self) -> bool {
        matches!(self.kind, ComboKind::Rune { .. })
    }

    /// `true` when both combos reference at least one common frame feature.
    pub fn shares_feature_with(&self, other: &Self) -> bool {
        self.feature_ids.iter().any(|id| other.feature_ids.contains(id))
    }
}

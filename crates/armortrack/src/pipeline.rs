//! Per-frame detection-to-track pipeline.
//!
//! [`Pipeline`] wraps a [`PipelineConfig`] together with the pluggable
//! collaborators (classifier, associator). Create once, feed every frame:
//!
//! extract → match (with at least two blobs) → disambiguate → classify →
//! track update.
//!
//! Every stage degrades to an empty result instead of failing, so
//! [`Pipeline::process_frame`] always returns a [`FrameOutput`].

use std::path::Path;

use crate::classify::{classify_combos, Classifier, LabelMap, RoiConfig};
use crate::combo::{ArmorRules, CompositeTarget};
use crate::disambiguate::erase_conflicting_armors;
use crate::error::Error;
use crate::feature::{extract_light_blobs, ExtractConfig, LightBlob};
use crate::frame::Frame;
use crate::matcher::find_armors;
use crate::tracker::{
    Associator, GyroData, NearestCenter, TrackSet, TrackSnapshot, TrackUpdate, TrackerConfig,
};
use crate::vision::TeamColor;

/// Complete pipeline configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Light-bar color of the opposing team.
    pub color: TeamColor,
    /// Channel-difference threshold used to binarize color frames.
    pub binary_threshold: u8,
    /// Blob extraction.
    pub extract: ExtractConfig,
    /// Armor pairing rules.
    pub armor: ArmorRules,
    /// Number-region crop for the classifier.
    pub roi: RoiConfig,
    /// Classifier output index to robot type.
    pub labels: LabelMap,
    /// Track lifecycle, camera and filter noise.
    pub tracker: TrackerConfig,
    /// Default association policy.
    pub association: NearestCenter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color: TeamColor::default(),
            binary_threshold: 80,
            extract: ExtractConfig::default(),
            armor: ArmorRules::default(),
            roi: RoiConfig::default(),
            labels: LabelMap::default(),
            tracker: TrackerConfig::default(),
            association: NearestCenter::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Binarize a color image according to `color` and `binary_threshold`.
    pub fn frame(&self, image: image::RgbImage) -> Frame {
        Frame::from_color(image, self.color, self.binary_threshold)
    }
}

/// Per-stage counts of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FrameStats {
    /// External contours found.
    pub contours: usize,
    /// Blobs surviving the area and halo filters.
    pub blobs: usize,
    /// Armor candidates before disambiguation.
    pub candidates: usize,
    /// Armors after disambiguation.
    pub combos: usize,
    /// Live tracks after the update.
    pub tracks: usize,
}

/// Everything produced for one frame.
///
/// `features` and `contours` are the frame arena: `CompositeTarget::feature_ids`
/// index `features`, `LightBlob::contour` indexes `contours`.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Capture time of the frame.
    pub tick: f64,
    /// Traced external contours.
    pub contours: Vec<Vec<[i32; 2]>>,
    /// Light blobs, sorted left to right.
    pub features: Vec<LightBlob>,
    /// Disambiguated, classified armors.
    pub combos: Vec<CompositeTarget>,
    /// Track set after the update.
    pub tracks: TrackSet,
    /// Lifecycle events of this frame.
    pub update: TrackUpdate,
    /// Stage counts.
    pub stats: FrameStats,
}

impl FrameOutput {
    /// Serializable view for the application layer.
    pub fn report(&self) -> FrameReport {
        FrameReport {
            tick: self.tick,
            stats: self.stats,
            features: self.features.clone(),
            combos: self.combos.clone(),
            tracks: self.tracks.snapshots(),
        }
    }
}

/// JSON-friendly frame result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FrameReport {
    /// Capture time of the frame.
    pub tick: f64,
    /// Stage counts.
    pub stats: FrameStats,
    /// Light blobs.
    pub features: Vec<LightBlob>,
    /// Armors.
    pub combos: Vec<CompositeTarget>,
    /// Live tracks.
    pub tracks: Vec<TrackSnapshot>,
}

/// Primary pipeline interface.
pub struct Pipeline {
    config: PipelineConfig,
    classifier: Option<Box<dyn Classifier>>,
    associator: Box<dyn Associator>,
}

impl Pipeline {
    /// Pipeline without a classifier, associating with `config.association`.
    pub fn new(config: PipelineConfig) -> Self {
        let associator = Box::new(config.association.clone());
        Self {
            config,
            classifier: None,
            associator,
        }
    }

    /// Attach a number classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Replace the association policy.
    pub fn with_associator(mut self, associator: Box<dyn Associator>) -> Self {
        self.associator = associator;
        self
    }

    /// Access the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on one frame and advance `tracks`.
    pub fn process_frame(
        &self,
        frame: &Frame,
        tracks: TrackSet,
        gyro: &GyroData,
        tick: f64,
    ) -> FrameOutput {
        let cfg = &self.config;
        let (contours, mut features) = extract_light_blobs(frame, &cfg.extract);

        let mut combos = if features.len() >= 2 {
            find_armors(&mut features, &cfg.armor, tick)
        } else {
            Vec::new()
        };
        let candidates = combos.len();
        erase_conflicting_armors(&mut combos);

        if let Some(classifier) = self.classifier.as_deref() {
            classify_combos(&frame.image, &mut combos, classifier, &cfg.labels, &cfg.roi);
        }

        let mut tracks = tracks;
        let update = self.update_tracks(&mut tracks, combos.clone(), gyro, tick);

        let stats = FrameStats {
            contours: contours.len(),
            blobs: features.len(),
            candidates,
            combos: combos.len(),
            tracks: tracks.len(),
        };
        tracing::info!(
            "frame {:.3}: {} blobs, {} armor candidates, {} armors, {} tracks",
            tick,
            stats.blobs,
            stats.candidates,
            stats.combos,
            stats.tracks
        );

        FrameOutput {
            tick,
            contours,
            features,
            combos,
            tracks,
            update,
            stats,
        }
    }

    /// Feed already-built combos (e.g. rune panels from an external detector)
    /// to the track set.
    pub fn update_tracks(
        &self,
        tracks: &mut TrackSet,
        combos: Vec<CompositeTarget>,
        gyro: &GyroData,
        tick: f64,
    ) -> TrackUpdate {
        tracks.update(combos, gyro, tick, &self.config.tracker, self.associator.as_ref())
    }
}

/// One-shot [`Pipeline::process_frame`] with the default associator and no
/// classifier.
pub fn process_frame(
    frame: &Frame,
    tracks: TrackSet,
    gyro: &GyroData,
    tick: f64,
    config: &PipelineConfig,
) -> FrameOutput {
    Pipeline::new(config.clone()).process_frame(frame, tracks, gyro, tick)
}

//! armortrack: light-bar armor detection and gyro-fused target tracking.
//!
//! Turns color frames from a robot's gimbal camera into a maintained set of
//! tracked targets with filtered kinematic state. The pipeline stages are:
//!
//! 1. **Extract** – external contours of the binarized frame become
//!    [`LightBlob`]s; noise and over-exposed lights are pruned.
//! 2. **Match** – blobs are sorted left to right and paired into armor
//!    plates under geometric rules; pairs enclosing another blob are dropped.
//! 3. **Disambiguate** – candidates competing for a bar are resolved by
//!    width and fit error.
//! 4. **Classify** – an optional external model labels each plate's number.
//! 5. **Track** – observations are associated with live [`Tracker`]s, which
//!    fuse the gimbal reading through Kalman filters and count vanishes.
//!
//! # Public API
//! - [`Pipeline`] and [`PipelineConfig`] as primary entry points
//! - [`TrackSet`] carried between frames
//! - stage functions and geometry rules for custom pipelines
//! - [`vision`] and [`filter`] primitives

mod classify;
mod combo;
mod disambiguate;
mod error;
mod feature;
pub mod filter;
mod frame;
mod matcher;
mod pipeline;
mod tracker;
pub mod vision;

#[cfg(test)]
mod test_utils;

pub use classify::{classify_combos, number_roi, Classifier, LabelMap, RobotType, RoiConfig};
pub use combo::{Armor, ArmorRules, ArmorSize, ComboKind, CompositeTarget};
pub use disambiguate::erase_conflicting_armors;
pub use error::Error;
pub use feature::{erase_bright_blobs, extract_light_blobs, ExtractConfig, LightBlob, Tag};
pub use filter::{FilterNoise, KalmanFilter, Kf21, Kf42, Kf44};
pub use frame::Frame;
pub use matcher::find_armors;
pub use pipeline::{process_frame, FrameOutput, FrameReport, FrameStats, Pipeline, PipelineConfig};
pub use tracker::{
    Associator, CameraConfig, GyroData, GyroTracker, NearestCenter, RuneTracker, TrackId,
    TrackSet, TrackSnapshot, TrackState, TrackUpdate, Tracker, TrackerConfig,
};
pub use vision::{RotatedRect, TeamColor};

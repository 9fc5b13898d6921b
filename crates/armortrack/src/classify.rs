//! Classifier adapter: crop a plate's number region and ask an external model.
//!
//! The model itself is a collaborator behind [`Classifier`]. Its raw output
//! index is mapped to a [`RobotType`] through a [`LabelMap`] owned by the
//! pipeline configuration. Any failure leaves the label `Unknown`.

use image::{GrayImage, Luma, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::combo::CompositeTarget;
use crate::error::Error;

/// Category of the robot an armor plate belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RobotType {
    /// Not classified.
    #[default]
    Unknown,
    /// Hero (1).
    Hero,
    /// Engineer (2).
    Engineer,
    /// Infantry 3.
    Infantry3,
    /// Infantry 4.
    Infantry4,
    /// Infantry 5.
    Infantry5,
    /// Outpost.
    Outpost,
    /// Base.
    Base,
    /// Sentry.
    Sentry,
}

/// Mapping from classifier output index to [`RobotType`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LabelMap(pub Vec<RobotType>);

impl Default for LabelMap {
    fn default() -> Self {
        Self(vec![
            RobotType::Unknown,
            RobotType::Hero,
            RobotType::Engineer,
            RobotType::Infantry3,
            RobotType::Infantry4,
            RobotType::Infantry5,
            RobotType::Outpost,
            RobotType::Base,
            RobotType::Sentry,
        ])
    }
}

impl LabelMap {
    /// Label for a classifier index; out-of-range indices are `Unknown`.
    pub fn label(&self, index: usize) -> RobotType {
        self.0.get(index).copied().unwrap_or_default()
    }
}

/// External image classifier.
pub trait Classifier {
    /// Classify a grayscale patch, returning the model's class index.
    fn classify(&self, roi: &GrayImage) -> Result<usize, Error>;
}

impl<F> Classifier for F
where
    F: Fn(&GrayImage) -> Result<usize, Error>,
{
    fn classify(&self, roi: &GrayImage) -> Result<usize, Error> {
        self(roi)
    }
}

/// Number-region crop settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Output patch width in pixels.
    pub width: u32,
    /// Output patch height in pixels.
    pub height: u32,
    /// Vertical extension of the bar endpoints, as a fraction of bar length.
    ///
    /// Light bars are shorter than the number sticker between them.
    pub height_scale: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            height_scale: 0.5,
        }
    }
}

/// Warp the plate's number region into a fixed-size grayscale patch.
///
/// Returns `None` when the quadrilateral is degenerate.
pub fn number_roi(
    image: &RgbImage,
    combo: &CompositeTarget,
    config: &RoiConfig,
) -> Option<GrayImage> {
    if config.width == 0 || config.height == 0 {
        return None;
    }
    let [lb, lt, rt, rb] = combo.corners;
    let extend = |top: [f32; 2], bottom: [f32; 2]| {
        let dx = (top[0] - bottom[0]) * config.height_scale;
        let dy = (top[1] - bottom[1]) * config.height_scale;
        ([top[0] + dx, top[1] + dy], [bottom[0] - dx, bottom[1] - dy])
    };
    let (lt, lb) = extend(lt, lb);
    let (rt, rb) = extend(rt, rb);

    let (w, h) = (config.width as f32, config.height as f32);
    let projection = Projection::from_control_points(
        [
            (lt[0], lt[1]),
            (rt[0], rt[1]),
            (rb[0], rb[1]),
            (lb[0], lb[1]),
        ],
        [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)],
    )?;

    let gray = image::imageops::grayscale(image);
    let mut out = GrayImage::new(config.width, config.height);
    warp_into(&gray, &projection, Interpolation::Bilinear, Luma([0]), &mut out);
    Some(out)
}

/// Assign labels to armor combos. Rune combos are left untouched.
///
/// Every failure path (degenerate crop, classifier error, unmapped index)
/// degrades to [`RobotType::Unknown`].
pub fn classify_combos(
    image: &RgbImage,
    combos: &mut [CompositeTarget],
    classifier: &dyn Classifier,
    labels: &LabelMap,
    config: &RoiConfig,
) {
    for combo in combos.iter_mut().filter(|c| c.is_armor()) {
        let Some(roi) = number_roi(image, combo, config) else {
            combo.label = RobotType::Unknown;
            continue;
        };
        combo.label = match classifier.classify(&roi) {
            Ok(index) => labels.label(index),
            Err(e) => {
                tracing::warn!("classifier failed at {:?}: {}", combo.center, e);
                RobotType::Unknown
            }
        };
    }
}

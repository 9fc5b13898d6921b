//! Primitive extraction: contours → light blobs → brightness halo pruning.

use image::RgbImage;

use super::LightBlob;
use crate::frame::Frame;
use crate::vision;

/// Number of halo samples taken on each side of a blob center.
const HALO_SAMPLES_PER_SIDE: i32 = 5;

/// Configuration for light-blob extraction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Contours enclosing less area than this (square pixels) are noise.
    pub min_contour_area: f32,
    /// Enable the brightness halo test.
    pub erase_bright: bool,
    /// A blob whose summed halo brightness exceeds this value is dropped.
    pub bright_sum_threshold: u32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_contour_area: 20.0,
            erase_bright: true,
            bright_sum_threshold: 1100,
        }
    }
}

/// Extract light blobs from a frame.
///
/// Returns the external contours (the frame arena the blobs index into) and
/// the surviving blobs in contour order. Degenerate fits are dropped silently.
pub fn extract_light_blobs(
    frame: &Frame,
    config: &ExtractConfig,
) -> (Vec<Vec<[i32; 2]>>, Vec<LightBlob>) {
    let contours = vision::external_contours(&frame.binary);

    let mut blobs: Vec<LightBlob> = contours
        .iter()
        .enumerate()
        .filter(|(_, c)| vision::contour_area(c) >= config.min_contour_area)
        .filter_map(|(index, c)| LightBlob::from_contour(c, index))
        .collect();

    let n_fitted = blobs.len();
    if config.erase_bright {
        erase_bright_blobs(&frame.image, &mut blobs, config.bright_sum_threshold);
    }
    tracing::trace!(
        "{} contours, {} blobs fitted, {} after brightness test",
        contours.len(),
        n_fitted,
        blobs.len()
    );

    (contours, blobs)
}

/// Drop blobs sitting on an over-exposed background.
///
/// Ten points on the horizontal line through the center, spaced by a fifth
/// of the blob height and excluding the center itself, are sampled. Genuine
/// light bars have a dark surrounding; lamps and reflections do not.
pub fn erase_bright_blobs(image: &RgbImage, blobs: &mut Vec<LightBlob>, threshold: u32) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    blobs.retain(|blob| halo_brightness(image, blob) <= threshold);
}

fn halo_brightness(image: &RgbImage, blob: &LightBlob) -> u32 {
    let (w, h) = image.dimensions();
    let y = (blob.center[1] as i64).clamp(0, h as i64 - 1) as u32;
    let mut total = 0u32;
    for i in -HALO_SAMPLES_PER_SIDE..=HALO_SAMPLES_PER_SIDE {
        if i == 0 {
            continue;
        }
        let offset = blob.height * i as f32 / HALO_SAMPLES_PER_SIDE as f32;
        let x = ((blob.center[0] - offset) as i64).clamp(0, w as i64 - 1) as u32;
        let [r, g, b] = image.get_pixel(x, y).0;
        // 0.1 * b + 0.6 * g + 0.3 * r, truncated
        total += (b as u32 + 6 * g as u32 + 3 * r as u32) / 10;
    }
    total
}

use image::{GrayImage, RgbImage};

use crate::vision::{binarize, TeamColor};

/// One captured frame: the color image and its binary light-bar mask.
///
/// Both images must have the same dimensions. Contours are traced on
/// `binary`; brightness sampling and classifier crops read `image`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Color image (RGB channel order).
    pub image: RgbImage,
    /// Binary mask, non-zero pixels are light-bar candidates.
    pub binary: GrayImage,
}

impl Frame {
    /// Wrap an image with an externally computed mask.
    pub fn new(image: RgbImage, binary: GrayImage) -> Self {
        debug_assert_eq!(image.dimensions(), binary.dimensions());
        Self { image, binary }
    }

    /// Build the mask by channel-difference thresholding for `color`.
    pub fn from_color(image: RgbImage, color: TeamColor, threshold: u8) -> Self {
        let binary = binarize(&image, color, threshold);
        Self { image, binary }
    }

    /// Image dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

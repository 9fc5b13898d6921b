//! Primitive features extracted directly from a frame.
//!
//! [`LightBlob`] is the elongated bright bar that armors are paired from;
//! [`Tag`] is a four-corner fiducial delivered by an external corner detector.

mod extract;

pub use extract::{erase_bright_blobs, extract_light_blobs, ExtractConfig};

use crate::error::Error;
use crate::vision::{self, RotatedRect};

/// An elongated bright region (light bar).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightBlob {
    /// Center (x, y) in image pixels.
    pub center: [f32; 2],
    /// Short side of the rotated bounding rectangle (pixels).
    pub width: f32,
    /// Long side of the rotated bounding rectangle (pixels).
    pub height: f32,
    /// Tilt of the long axis from image vertical, degrees in `(-90, 90]`.
    pub angle: f32,
    /// Index of the source contour in the frame that produced this blob.
    pub contour: usize,
}

impl LightBlob {
    /// Build a blob from a traced contour; `None` when the fit is degenerate.
    pub fn from_contour(contour: &[[i32; 2]], contour_index: usize) -> Option<Self> {
        vision::min_area_rect(contour).map(|rect| Self::from_rect(rect, contour_index))
    }

    /// Build a blob from an already fitted rotated rectangle.
    pub fn from_rect(rect: RotatedRect, contour_index: usize) -> Self {
        Self {
            center: rect.center,
            width: rect.short_side,
            height: rect.long_side,
            angle: rect.angle,
            contour: contour_index,
        }
    }

    /// Unit vector along the long axis, pointing to the top end.
    pub fn axis(&self) -> [f32; 2] {
        let a = self.angle.to_radians();
        [a.sin(), -a.cos()]
    }

    /// Top and bottom end points of the long axis.
    pub fn endpoints(&self) -> ([f32; 2], [f32; 2]) {
        let [ux, uy] = self.axis();
        let half = 0.5 * self.height;
        let [cx, cy] = self.center;
        (
            [cx + ux * half, cy + uy * half],
            [cx - ux * half, cy - uy * half],
        )
    }

    /// Elongation `height / width`.
    pub fn aspect_ratio(&self) -> f32 {
        self.height / self.width.max(f32::EPSILON)
    }
}

/// A four-corner fiducial feature.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tag {
    /// Corners in detector order.
    pub corners: [[f32; 2]; 4],
    /// Mean of the corners.
    pub center: [f32; 2],
    /// Longer of the first two edges (pixels).
    pub width: f32,
    /// Shorter of the first two edges (pixels).
    pub height: f32,
    /// Decoded tag identifier.
    pub id: u32,
}

impl Tag {
    /// Build a tag from exactly four corners.
    pub fn new(corners: &[[f32; 2]], id: u32) -> Result<Self, Error> {
        let corners: [[f32; 2]; 4] = corners.try_into().map_err(|_| Error::InvalidCornerCount {
            expected: 4,
            got: corners.len(),
        })?;

        let mut center = [0.0f32; 2];
        for c in &corners {
            center[0] += c[0] / 4.0;
            center[1] += c[1] / 4.0;
        }
        let l0 = vision::distance(corners[0], corners[1]);
        let l1 = vision::distance(corners[1], corners[2]);

        Ok(Self {
            corners,
            center,
            width: l0.max(l1),
            height: l0.min(l1),
            id,
        })
    }
}

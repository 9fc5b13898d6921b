//! Shared helpers for synthetic-frame unit tests.

use image::{Rgb, RgbImage};

use crate::feature::LightBlob;
use crate::frame::Frame;
use crate::vision::TeamColor;

pub(crate) const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Paint an upright `width x height` bar centered at `center`.
///
/// Pixel `(x, y)` is painted when its center lies strictly inside the bar.
pub(crate) fn draw_bar(
    img: &mut RgbImage,
    center: [f32; 2],
    width: f32,
    height: f32,
    rgb: [u8; 3],
) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let dx = (x as f32 + 0.5 - center[0]).abs();
            let dy = (y as f32 + 0.5 - center[1]).abs();
            if dx < width * 0.5 && dy < height * 0.5 {
                img.put_pixel(x, y, Rgb(rgb));
            }
        }
    }
}

/// Black frame with red upright bars at `centers`, binarized for red.
pub(crate) fn bar_frame(w: u32, h: u32, centers: &[[f32; 2]], width: f32, height: f32) -> Frame {
    let mut img = RgbImage::from_pixel(w, h, BLACK);
    for &c in centers {
        draw_bar(&mut img, c, width, height, [255, 0, 0]);
    }
    Frame::from_color(img, TeamColor::Red, 80)
}

/// Light blob with explicit geometry.
pub(crate) fn blob(
    center: [f32; 2],
    width: f32,
    height: f32,
    angle: f32,
    contour: usize,
) -> LightBlob {
    LightBlob {
        center,
        width,
        height,
        angle,
        contour,
    }
}

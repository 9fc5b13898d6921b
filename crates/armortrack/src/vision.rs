//! Low-level vision primitives used by the extractor and the matcher.
//!
//! Contour tracing and the rotated-rectangle fit come from `imageproc`; the
//! rest is small 2-D geometry that does not warrant a dependency.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;

const DEGENERATE_SIDE_PX: f32 = 1e-3;

/// Color of the light bars to binarize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamColor {
    /// Red light bars (red channel minus blue channel).
    #[default]
    Red,
    /// Blue light bars (blue channel minus red channel).
    Blue,
}

/// Minimal rotated bounding rectangle of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    /// Rectangle center (x, y) in pixels.
    pub center: [f32; 2],
    /// Longer side length in pixels.
    pub long_side: f32,
    /// Shorter side length in pixels.
    pub short_side: f32,
    /// Tilt of the long side from image vertical, degrees in `(-90, 90]`.
    pub angle: f32,
}

/// Outer borders that are not nested in any hole (external-only retrieval).
///
/// Non-zero pixels are foreground. The order follows the raster scan of the
/// contour tracer, so it is stable for a given image.
pub fn external_contours(binary: &GrayImage) -> Vec<Vec<[i32; 2]>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| c.points.into_iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Enclosed area of a closed contour (shoelace formula), in square pixels.
pub fn contour_area(points: &[[i32; 2]]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p[0] as i64 * q[1] as i64 - q[0] as i64 * p[1] as i64;
    }
    (twice_area.abs() as f32) * 0.5
}

/// Fit the minimal-area rotated rectangle around `points`.
///
/// The convex hull is exact on the integer contour; the caliper sweep over
/// its edges runs in `f32`, so corners and tilt are not snapped to pixels.
/// Returns `None` for fewer than three points or when the fit collapses to a
/// segment or a point (collinear input).
pub fn min_area_rect(points: &[[i32; 2]]) -> Option<RotatedRect> {
    if points.len() < 3 {
        return None;
    }
    let pts: Vec<Point<i32>> = points.iter().map(|p| Point::new(p[0], p[1])).collect();
    let hull: Vec<[f32; 2]> = convex_hull::<i32>(pts)
        .into_iter()
        .map(|p| [p.x as f32, p.y as f32])
        .collect();
    if hull.len() < 3 {
        return None;
    }

    let mut best: Option<(f32, RotatedRect)> = None;
    for (i, &a) in hull.iter().enumerate() {
        let edge = sub(hull[(i + 1) % hull.len()], a);
        let len = norm(edge);
        if len < DEGENERATE_SIDE_PX {
            continue;
        }
        let u = [edge[0] / len, edge[1] / len];
        let v = [-u[1], u[0]];

        let (mut u_min, mut u_max) = (f32::MAX, f32::MIN);
        let (mut v_min, mut v_max) = (f32::MAX, f32::MIN);
        for p in &hull {
            let (pu, pv) = (dot(*p, u), dot(*p, v));
            u_min = u_min.min(pu);
            u_max = u_max.max(pu);
            v_min = v_min.min(pv);
            v_max = v_max.max(pv);
        }
        let (lu, lv) = (u_max - u_min, v_max - v_min);
        let area = lu * lv;
        if best.as_ref().is_some_and(|(best_area, _)| *best_area <= area) {
            continue;
        }

        let (cu, cv) = ((u_min + u_max) * 0.5, (v_min + v_max) * 0.5);
        let center = [u[0] * cu + v[0] * cv, u[1] * cu + v[1] * cv];
        let (long_side, short_side, axis) = if lu >= lv { (lu, lv, u) } else { (lv, lu, v) };
        best = Some((
            area,
            RotatedRect {
                center,
                long_side,
                short_side,
                angle: axis_tilt_deg(axis),
            },
        ));
    }

    best.map(|(_, rect)| rect).filter(|r| r.short_side >= DEGENERATE_SIDE_PX)
}

/// Tilt of an axis direction from image vertical in degrees, `(-90, 90]`.
///
/// Positive when the upper end of the axis leans right.
pub fn axis_tilt_deg(axis: [f32; 2]) -> f32 {
    // Point the axis upwards (image y grows downwards).
    let [dx, dy] = if axis[1] > 0.0 { [-axis[0], -axis[1]] } else { axis };
    let angle = dx.atan2(-dy).to_degrees();
    if angle <= -90.0 {
        angle + 180.0
    } else if angle > 90.0 {
        angle - 180.0
    } else {
        angle
    }
}

/// Ray-crossing point-in-polygon test. Points on an edge are unspecified.
pub fn polygon_contains(polygon: &[[f32; 2]], p: [f32; 2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x_cross = a[0] + (p[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
            if p[0] < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Threshold the channel difference that isolates light bars of `color`.
pub fn binarize(image: &RgbImage, color: TeamColor, threshold: u8) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        let [r, _, b] = px.0;
        let diff = match color {
            TeamColor::Red => r as i16 - b as i16,
            TeamColor::Blue => b as i16 - r as i16,
        };
        if diff > threshold as i16 {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

#[inline]
pub(crate) fn sub(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
pub(crate) fn norm(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

#[inline]
fn dot(a: [f32; 2], b: [f32; 2]) -> f32 {
    a[0] * b[0] + a[1] * b[1]
}

#[inline]
pub(crate) fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    norm(sub(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_bar, BLACK};
    use approx::assert_abs_diff_eq;

    #[test]
    fn shoelace_area_of_axis_aligned_square() {
        let square = [[0, 0], [10, 0], [10, 10], [0, 10]];
        assert_abs_diff_eq!(contour_area(&square), 100.0);
        assert_eq!(contour_area(&[[0, 0], [1, 1]]), 0.0);
    }

    #[test]
    fn collinear_points_have_no_rectangle() {
        let line = [[0, 0], [5, 5], [10, 10], [15, 15]];
        assert!(min_area_rect(&line).is_none());
        assert!(min_area_rect(&[[0, 0], [3, 4]]).is_none());
    }

    #[test]
    fn upright_bar_fits_vertical_rectangle() {
        let contour = [[96, 185], [103, 185], [103, 214], [96, 214]];
        let rect = min_area_rect(&contour).expect("rectangle");
        assert_abs_diff_eq!(rect.center[0], 99.5, epsilon = 1e-3);
        assert_abs_diff_eq!(rect.center[1], 199.5, epsilon = 1e-3);
        assert_abs_diff_eq!(rect.long_side, 29.0, epsilon = 1e-3);
        assert_abs_diff_eq!(rect.short_side, 7.0, epsilon = 1e-3);
        assert_abs_diff_eq!(rect.angle.abs(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn tilted_bar_keeps_subpixel_tilt() {
        // Long side (3, -30), short side (10, 1): about 5.71 degrees, leaning right.
        let contour = [[100, 200], [103, 170], [113, 171], [110, 201]];
        let rect = min_area_rect(&contour).expect("rectangle");
        assert_abs_diff_eq!(rect.angle, 3.0f32.atan2(30.0).to_degrees(), epsilon = 1e-3);
        assert_abs_diff_eq!(rect.long_side, 909.0f32.sqrt(), epsilon = 1e-3);
        assert_abs_diff_eq!(rect.short_side, 101.0f32.sqrt(), epsilon = 1e-3);
        assert_abs_diff_eq!(rect.center[0], 106.5, epsilon = 1e-3);
        assert_abs_diff_eq!(rect.center[1], 185.5, epsilon = 1e-3);

        let tri = min_area_rect(&[[0, 0], [1, 0], [0, 1]]).expect("rectangle");
        assert_abs_diff_eq!(tri.long_side * tri.short_side, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn tilt_sign_follows_top_lean() {
        assert_abs_diff_eq!(axis_tilt_deg([1.0, -1.0]), 45.0, epsilon = 1e-4);
        assert_abs_diff_eq!(axis_tilt_deg([-1.0, 1.0]), 45.0, epsilon = 1e-4);
        assert_abs_diff_eq!(axis_tilt_deg([-1.0, -1.0]), -45.0, epsilon = 1e-4);
        assert_abs_diff_eq!(axis_tilt_deg([-1.0, 0.0]), 90.0, epsilon = 1e-4);
    }

    #[test]
    fn polygon_contains_interior_only() {
        let quad = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        assert!(polygon_contains(&quad, [5.0, 5.0]));
        assert!(!polygon_contains(&quad, [15.0, 5.0]));
        assert!(!polygon_contains(&quad, [5.0, -1.0]));
    }

    #[test]
    fn external_contours_skip_nested_shapes() {
        let mut img = image::RgbImage::from_pixel(80, 80, BLACK);
        draw_bar(&mut img, [20.0, 40.0], 8.0, 30.0, [255, 0, 0]);
        draw_bar(&mut img, [60.0, 40.0], 8.0, 30.0, [255, 0, 0]);
        let bin = binarize(&img, TeamColor::Red, 50);

        let contours = external_contours(&bin);
        assert_eq!(contours.len(), 2);

        // A ring: the inner island must not be reported.
        let mut ring = GrayImage::new(40, 40);
        for y in 5..35 {
            for x in 5..35 {
                let border = !(10..30).contains(&x) || !(10..30).contains(&y);
                let island = (17..23).contains(&x) && (17..23).contains(&y);
                if border || island {
                    ring.put_pixel(x, y, Luma([255]));
                }
            }
        }
        assert_eq!(external_contours(&ring).len(), 1);
    }

    #[test]
    fn binarize_respects_team_color() {
        let mut img = image::RgbImage::from_pixel(4, 1, BLACK);
        img.put_pixel(0, 0, image::Rgb([250, 20, 20]));
        img.put_pixel(1, 0, image::Rgb([20, 20, 250]));
        img.put_pixel(2, 0, image::Rgb([255, 255, 255]));
        let red = binarize(&img, TeamColor::Red, 100);
        let blue = binarize(&img, TeamColor::Blue, 100);
        assert_eq!(red.get_pixel(0, 0)[0], 255);
        assert_eq!(red.get_pixel(1, 0)[0], 0);
        assert_eq!(red.get_pixel(2, 0)[0], 0);
        assert_eq!(blue.get_pixel(1, 0)[0], 255);
        assert_eq!(blue.get_pixel(0, 0)[0], 0);
    }
}

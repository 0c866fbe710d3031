//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up images, `row_rotation` and `col_rotation` are typically 0,
/// and `pixel_height` is negative. Lengths and areas derived from a transform
/// are in the linear unit of its CRS, which streamnet assumes to be meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    #[serde(default)]
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    #[serde(default)]
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Convert pixel coordinates to geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Absolute pixel width
    pub fn dx(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Absolute pixel height
    pub fn dy(&self) -> f64 {
        self.pixel_height.abs()
    }

    /// Area of a single pixel
    pub fn pixel_area(&self) -> f64 {
        self.dx() * self.dy()
    }

    /// Distance between the centers of two pixels separated by `(dr, dc)` rows and columns.
    pub fn step_length(&self, dr: isize, dc: isize) -> f64 {
        let x = dc as f64 * self.dx();
        let y = dr as f64 * self.dy();
        x.hypot(y)
    }

    /// Compare two transforms allowing for floating point noise in the coefficients.
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        let a = self.coefficients();
        let b = other.coefficients();
        a.iter().zip(b.iter()).all(|(x, y)| {
            let scale = x.abs().max(y.abs()).max(1.0);
            (x - y).abs() <= 1e-9 * scale
        })
    }

    fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[origin=({}, {}), pixel=({}, {})]",
            self.origin_x, self.origin_y, self.pixel_width, self.pixel_height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_center() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.pixel_to_geo(5, 10);
        assert_relative_eq!(x, 155.0, epsilon = 1e-10);
        assert_relative_eq!(y, 95.0, epsilon = 1e-10);
    }

    #[test]
    fn test_step_lengths() {
        let gt = GeoTransform::new(0.0, 0.0, 10.0, -5.0);
        assert_relative_eq!(gt.step_length(0, 1), 10.0);
        assert_relative_eq!(gt.step_length(-1, 0), 5.0);
        assert_relative_eq!(gt.step_length(1, -1), 125.0_f64.sqrt());
        assert_relative_eq!(gt.pixel_area(), 50.0);
    }

    #[test]
    fn test_approx_eq() {
        let a = GeoTransform::new(500000.0, 4000000.0, 10.0, -10.0);
        let mut b = a;
        b.origin_x += 1e-7;
        assert!(a.approx_eq(&b));
        b.pixel_width = 30.0;
        assert!(!a.approx_eq(&b));
    }

    #[test]
    fn test_serde_defaults_rotation() {
        let gt: GeoTransform = serde_json::from_str(
            r#"{"origin_x": 0.0, "origin_y": 50.0, "pixel_width": 10.0, "pixel_height": -10.0}"#,
        )
        .unwrap();
        assert_eq!(gt, GeoTransform::new(0.0, 50.0, 10.0, -10.0));
    }
}

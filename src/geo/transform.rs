use serde::Serialize;

/// A pair of doubles: a ground sample distance, tie point or scale factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DPoint {
    pub x: f64,
    pub y: f64,
}

impl DPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Six-coefficient affine georeferencing transform.
///
/// Maps pixel `(col, row)` to ground:
///
/// ```text
/// X = translate_x + col * scale_x + row * shear_x
/// Y = translate_y + col * shear_y + row * scale_y
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    pub translate_x: f64,
    pub scale_x: f64,
    pub shear_x: f64,
    pub translate_y: f64,
    pub shear_y: f64,
    pub scale_y: f64,
}

impl GeoTransform {
    /// Absolute pixel size along each axis.
    pub fn gsd(&self) -> DPoint {
        DPoint::new(self.scale_x.abs(), self.scale_y.abs())
    }

    /// Ground position of the upper-left pixel.
    pub fn tie_point(&self) -> DPoint {
        DPoint::new(self.translate_x, self.translate_y)
    }

    pub fn has_rotation(&self) -> bool {
        self.shear_x != 0.0 || self.shear_y != 0.0
    }

    pub fn pixel_to_ground(&self, col: f64, row: f64) -> DPoint {
        DPoint::new(
            self.translate_x + col * self.scale_x + row * self.shear_x,
            self.translate_y + col * self.shear_y + row * self.scale_y,
        )
    }
}

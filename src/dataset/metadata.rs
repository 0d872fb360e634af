use serde::{Deserialize, Serialize};

use crate::geo::GeoTransform;
use crate::raster::{DataTypeTag, Rect, TileGrid};

/// Size of one resolution level in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelSize {
    pub width: u32,
    pub height: u32,
}

impl LevelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Read-only image description exposed by a dataset after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Upper-left x of the full-resolution image
    #[serde(default)]
    pub min_x: i32,

    /// Upper-left y of the full-resolution image
    #[serde(default)]
    pub min_y: i32,

    /// Full-resolution width in pixels
    pub width: u32,

    /// Full-resolution height in pixels
    pub height: u32,

    /// Native tile width
    pub tile_width: u32,

    /// Native tile height
    pub tile_height: u32,

    /// Number of bands per pixel
    pub num_bands: u32,

    /// Sample type tag
    pub data_type: DataTypeTag,

    /// Reduced-resolution levels stored inside the dataset, finest first
    #[serde(default)]
    pub overviews: Vec<LevelSize>,
}

impl ImageMetadata {
    /// Full-resolution image rectangle, `None` for zero dimensions.
    pub fn image_rect(&self) -> Option<Rect> {
        Rect::from_origin_size(self.min_x, self.min_y, self.width, self.height)
    }

    /// Native tile grid, `None` for a zero tile size.
    pub fn tile_grid(&self) -> Option<TileGrid> {
        TileGrid::new(self.tile_width, self.tile_height)
    }

    pub fn full_size(&self) -> LevelSize {
        LevelSize::new(self.width, self.height)
    }

    /// Rectangle of a reduced-resolution level.
    ///
    /// The level-0 origin is scaled by the level's decimation so sub-image
    /// offsets carry through the pyramid.
    pub fn level_rect(&self, size: LevelSize) -> Option<Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x = (self.min_x as i64 * size.width as i64).div_euclid(self.width as i64);
        let y = (self.min_y as i64 * size.height as i64).div_euclid(self.height as i64);
        Rect::from_origin_size(x as i32, y as i32, size.width, size.height)
    }
}

/// Per-band value range of the image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Histogram {
    pub fn min(&self, band: u32) -> Option<f64> {
        self.min.get(band as usize).copied()
    }

    pub fn max(&self, band: u32) -> Option<f64> {
        self.max.get(band as usize).copied()
    }
}

/// Affine georeferencing plus spatial reference code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Georeferencing {
    /// Spatial reference code, e.g. `"EPSG:4326"`
    pub spatial_reference_system_code: String,
    pub translate_x: f64,
    pub scale_x: f64,
    #[serde(default)]
    pub shear_x: f64,
    pub translate_y: f64,
    #[serde(default)]
    pub shear_y: f64,
    pub scale_y: f64,
}

impl Georeferencing {
    pub fn transform(&self) -> GeoTransform {
        GeoTransform {
            translate_x: self.translate_x,
            scale_x: self.scale_x,
            shear_x: self.shear_x,
            translate_y: self.translate_y,
            shear_y: self.shear_y,
            scale_y: self.scale_y,
        }
    }

    /// Numeric part of the spatial reference code.
    ///
    /// Accepts `"EPSG:4326"`, `"epsg:4326"` or a bare `"4326"`.
    pub fn epsg_code(&self) -> Option<&str> {
        let code = self.spatial_reference_system_code.trim();
        let code = match code.split_once(':') {
            Some((authority, rest)) if authority.eq_ignore_ascii_case("EPSG") => rest,
            Some(_) => return None,
            None => code,
        };
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(code)
    }
}

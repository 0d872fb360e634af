use serde::Serialize;

use super::element::{Element, ElementType, TileData};
use super::rect::{Point, Rect};

/// Fill state of a [`TileBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStatus {
    /// No samples allocated (no dataset was open)
    Null,
    /// Allocated but blank: no image data covers the rectangle
    Empty,
    /// Some pixels came from the image, the rest are blank
    Partial,
    /// Every pixel came from the image
    Full,
}

/// A multi-band pixel buffer covering one rectangle of image space.
///
/// Samples are band-sequential and row-major within a band.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBuffer {
    rect: Rect,
    bands: u32,
    data: TileData,
    status: DataStatus,
}

impl TileBuffer {
    /// Allocate a blank buffer.
    pub fn new(rect: Rect, bands: u32, element_type: ElementType) -> Self {
        let len = rect.area() * bands as usize;
        Self {
            rect,
            bands,
            data: TileData::zeroed(element_type, len),
            status: DataStatus::Empty,
        }
    }

    /// A buffer with no bands and no samples.
    pub fn null(rect: Rect) -> Self {
        Self {
            rect,
            bands: 0,
            data: TileData::U8(Vec::new()),
            status: DataStatus::Null,
        }
    }

    /// Wrap existing band-sequential samples.
    ///
    /// Returns `None` if the sample count does not match `rect` and `bands`.
    pub fn from_data(rect: Rect, bands: u32, data: TileData) -> Option<Self> {
        if data.len() != rect.area() * bands as usize {
            return None;
        }
        Some(Self {
            rect,
            bands,
            data,
            status: DataStatus::Full,
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn origin(&self) -> Point {
        self.rect.origin()
    }

    pub fn width(&self) -> u32 {
        self.rect.width()
    }

    pub fn height(&self) -> u32 {
        self.rect.height()
    }

    pub fn bands(&self) -> u32 {
        self.bands
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn status(&self) -> DataStatus {
        self.status
    }

    pub fn set_status(&mut self, status: DataStatus) {
        self.status = status;
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.status, DataStatus::Null | DataStatus::Empty)
    }

    pub fn data(&self) -> &TileData {
        &self.data
    }

    /// Samples per band.
    pub fn band_len(&self) -> usize {
        self.rect.area()
    }

    /// Zero every sample and mark the buffer blank.
    pub fn make_blank(&mut self) {
        self.data.fill_zero();
        if self.status != DataStatus::Null {
            self.status = DataStatus::Empty;
        }
    }

    /// Typed view of one band.
    pub fn band<T: Element>(&self, band: u32) -> Option<&[T]> {
        if band >= self.bands {
            return None;
        }
        let len = self.band_len();
        let start = band as usize * len;
        T::samples(&self.data).and_then(|s| s.get(start..start + len))
    }

    /// Typed mutable view of one band.
    pub fn band_mut<T: Element>(&mut self, band: u32) -> Option<&mut [T]> {
        if band >= self.bands {
            return None;
        }
        let len = self.band_len();
        let start = band as usize * len;
        T::samples_mut(&mut self.data).and_then(|s| s.get_mut(start..start + len))
    }

    /// Sample at an absolute image coordinate, widened to `f64`.
    pub fn pixel(&self, point: Point, band: u32) -> Option<f64> {
        if band >= self.bands || !self.rect.contains_point(point) {
            return None;
        }
        let col = (point.x - self.rect.min_x()) as usize;
        let row = (point.y - self.rect.min_y()) as usize;
        let index = band as usize * self.band_len() + row * self.width() as usize + col;
        self.data.value_f64(index)
    }
}

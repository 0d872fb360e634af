use std::path::Path;

use async_trait::async_trait;

use crate::error::DatasetError;
use crate::raster::{ElementType, TileData, TileIndex};

use super::metadata::{Georeferencing, Histogram, ImageMetadata, LevelSize};

// =============================================================================
// Raw Tiles
// =============================================================================

/// Handle naming one native tile of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileProxy {
    pub level: u32,
    pub index: TileIndex,
}

/// A decoded tile as delivered by the dataset.
///
/// Samples are pixel-interleaved: the value for `(row, col, band)` lives at
/// `(row * cols + col) * bands + band`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTile {
    rows: usize,
    cols: usize,
    bands: usize,
    samples: TileData,
}

impl RawTile {
    /// Wrap interleaved samples, checking the sample count against the shape.
    pub fn new(
        rows: usize,
        cols: usize,
        bands: usize,
        samples: TileData,
    ) -> Result<Self, DatasetError> {
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(bands))
            .ok_or_else(|| DatasetError::Malformed("raw tile shape overflows".to_string()))?;
        if samples.len() != expected {
            return Err(DatasetError::Malformed(format!(
                "raw tile {}x{}x{} holds {} samples, expected {}",
                rows,
                cols,
                bands,
                samples.len(),
                expected
            )));
        }
        Ok(Self {
            rows,
            cols,
            bands,
            samples,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn element_type(&self) -> ElementType {
        self.samples.element_type()
    }

    pub fn samples(&self) -> &TileData {
        &self.samples
    }
}

// =============================================================================
// Dataset Traits
// =============================================================================

/// An opened tiled dataset.
///
/// Implementations own the on-disk or remote layout and the tile decoder.
/// All metadata is immutable for the lifetime of the value.
#[async_trait]
pub trait TiledDataset: Send + Sync {
    /// Image description.
    fn metadata(&self) -> &ImageMetadata;

    /// Affine georeferencing, if the dataset carries one.
    fn georeferencing(&self) -> Option<&Georeferencing>;

    /// Per-band value range, if known.
    fn histogram(&self) -> Option<&Histogram>;

    /// Reduced-resolution levels kept outside the dataset, finest first.
    ///
    /// These follow the internal overviews in level numbering.
    fn external_overviews(&self) -> &[LevelSize] {
        &[]
    }

    /// Resolve the handle for a tile.
    fn tile_proxy(&self, level: u32, index: TileIndex) -> TileProxy {
        TileProxy { level, index }
    }

    /// Fetch and decode one tile.
    async fn fetch_raw_tile(&self, proxy: &TileProxy) -> Result<RawTile, DatasetError>;
}

/// Opens datasets by path.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// The dataset type this source produces.
    type Dataset: TiledDataset + 'static;

    /// Load the dataset at `path`.
    async fn load(&self, path: &Path) -> Result<Self::Dataset, DatasetError>;
}

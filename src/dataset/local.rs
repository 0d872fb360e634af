//! Filesystem-backed dataset.
//!
//! A dataset is a JSON manifest (conventionally `name.idaho`) next to a
//! directory of raw tile files:
//!
//! ```json
//! {
//!   "image": {
//!     "width": 1000, "height": 1000,
//!     "tile_width": 256, "tile_height": 256,
//!     "num_bands": 3, "data_type": "byte",
//!     "overviews": [{ "width": 500, "height": 500 }]
//!   },
//!   "georeferencing": {
//!     "spatial_reference_system_code": "EPSG:4326",
//!     "translate_x": -180.0, "scale_x": 0.36,
//!     "translate_y": 90.0, "scale_y": -0.18
//!   },
//!   "histogram": { "min": [0, 0, 0], "max": [255, 255, 255] },
//!   "tiles": "tiles/{level}/{x}_{y}.raw"
//! }
//! ```
//!
//! Each tile file holds little-endian samples, pixel-interleaved. Tiles on
//! the right and bottom edges may be stored either at full tile size or
//! clipped to the image.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use serde::Deserialize;
use tracing::debug;

use crate::error::DatasetError;
use crate::raster::{ElementType, TileData};

use super::metadata::{Georeferencing, Histogram, ImageMetadata, LevelSize};
use super::source::{DatasetSource, RawTile, TiledDataset, TileProxy};

/// Default tile path pattern, relative to the manifest directory.
pub const DEFAULT_TILE_PATTERN: &str = "tiles/{level}/{x}_{y}.raw";

fn default_tile_pattern() -> String {
    DEFAULT_TILE_PATTERN.to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    image: ImageMetadata,
    #[serde(default)]
    georeferencing: Option<Georeferencing>,
    #[serde(default)]
    histogram: Option<Histogram>,
    #[serde(default)]
    external_overviews: Vec<LevelSize>,
    #[serde(default = "default_tile_pattern")]
    tiles: String,
}

// =============================================================================
// LocalDataset
// =============================================================================

/// A dataset read from the local filesystem.
#[derive(Debug)]
pub struct LocalDataset {
    root: PathBuf,
    manifest: Manifest,
    levels: Vec<LevelSize>,
}

impl LocalDataset {
    /// Parse a manifest. Tile paths resolve against `root`.
    pub fn from_manifest(root: impl Into<PathBuf>, json: &[u8]) -> Result<Self, DatasetError> {
        let manifest: Manifest = serde_json::from_slice(json)
            .map_err(|e| DatasetError::Malformed(format!("manifest: {}", e)))?;

        let mut levels = vec![manifest.image.full_size()];
        levels.extend(manifest.image.overviews.iter().copied());
        levels.extend(manifest.external_overviews.iter().copied());

        Ok(Self {
            root: root.into(),
            manifest,
            levels,
        })
    }

    /// Path of the file holding a tile.
    pub fn tile_path(&self, proxy: &TileProxy) -> PathBuf {
        let relative = self
            .manifest
            .tiles
            .replace("{level}", &proxy.level.to_string())
            .replace("{x}", &proxy.index.x.to_string())
            .replace("{y}", &proxy.index.y.to_string());
        self.root.join(relative)
    }
}

#[async_trait]
impl TiledDataset for LocalDataset {
    fn metadata(&self) -> &ImageMetadata {
        &self.manifest.image
    }

    fn georeferencing(&self) -> Option<&Georeferencing> {
        self.manifest.georeferencing.as_ref()
    }

    fn histogram(&self) -> Option<&Histogram> {
        self.manifest.histogram.as_ref()
    }

    fn external_overviews(&self) -> &[LevelSize] {
        &self.manifest.external_overviews
    }

    async fn fetch_raw_tile(&self, proxy: &TileProxy) -> Result<RawTile, DatasetError> {
        let image = &self.manifest.image;
        let out_of_range = || DatasetError::TileOutOfRange {
            level: proxy.level,
            tile_x: proxy.index.x,
            tile_y: proxy.index.y,
        };

        let size = self
            .levels
            .get(proxy.level as usize)
            .copied()
            .ok_or_else(out_of_range)?;
        let level_rect = image
            .level_rect(size)
            .ok_or_else(|| DatasetError::Malformed("zero image dimensions".to_string()))?;
        let grid = image
            .tile_grid()
            .ok_or_else(|| DatasetError::Malformed("zero tile size".to_string()))?;
        let element_type = ElementType::from_tag(image.data_type).ok_or_else(|| {
            DatasetError::Malformed(format!("unsupported data type {:?}", image.data_type))
        })?;

        let tile_rect = grid
            .tile_rect(grid.tile_origin(proxy.index))
            .ok_or_else(out_of_range)?;
        let clipped = tile_rect.clip_to(&level_rect).ok_or_else(out_of_range)?;

        let path = self.tile_path(proxy);
        debug!(path = %path.display(), level = proxy.level, "reading tile");
        let bytes = Bytes::from(tokio::fs::read(&path).await?);

        let bands = image.num_bands as usize;
        let sample_size = element_type.size_in_bytes();
        let full = (grid.tile_height() as usize, grid.tile_width() as usize);
        let edge = (clipped.height() as usize, clipped.width() as usize);

        let (rows, cols) = if bytes.len() == full.0 * full.1 * bands * sample_size {
            full
        } else if bytes.len() == edge.0 * edge.1 * bands * sample_size {
            edge
        } else {
            return Err(DatasetError::Malformed(format!(
                "{}: {} bytes does not match a {}x{} or {}x{} tile of {} {} bands",
                path.display(),
                bytes.len(),
                full.1,
                full.0,
                edge.1,
                edge.0,
                bands,
                element_type
            )));
        };

        let samples = decode_le(bytes, element_type, rows * cols * bands);
        RawTile::new(rows, cols, bands, samples)
    }
}

/// Decode `count` little-endian samples.
///
/// The caller guarantees `bytes` holds at least `count` samples.
fn decode_le(mut bytes: Bytes, element_type: ElementType, count: usize) -> TileData {
    match element_type {
        ElementType::U8 => TileData::U8(bytes.slice(..count).to_vec()),
        ElementType::U16 => TileData::U16((0..count).map(|_| bytes.get_u16_le()).collect()),
        ElementType::I16 => TileData::I16((0..count).map(|_| bytes.get_i16_le()).collect()),
        ElementType::U32 => TileData::U32((0..count).map(|_| bytes.get_u32_le()).collect()),
        ElementType::I32 => TileData::I32((0..count).map(|_| bytes.get_i32_le()).collect()),
        ElementType::F32 => TileData::F32((0..count).map(|_| bytes.get_f32_le()).collect()),
        ElementType::F64 => TileData::F64((0..count).map(|_| bytes.get_f64_le()).collect()),
    }
}

// =============================================================================
// LocalSource
// =============================================================================

/// Loads [`LocalDataset`]s from manifest paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatasetSource for LocalSource {
    type Dataset = LocalDataset;

    async fn load(&self, path: &Path) -> Result<Self::Dataset, DatasetError> {
        let json = tokio::fs::read(path).await?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        LocalDataset::from_manifest(root, &json)
    }
}

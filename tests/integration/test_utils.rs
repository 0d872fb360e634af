//! Test utilities for integration tests.
//!
//! This module provides an in-memory dataset source whose tiles are generated
//! from pixel coordinates, so every read can be checked sample by sample, and
//! helpers for writing filesystem datasets.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

use tiled_raster::dataset::{
    DatasetSource, Georeferencing, Histogram, ImageMetadata, LevelSize, RawTile, TileProxy,
    TiledDataset,
};
use tiled_raster::error::DatasetError;
use tiled_raster::raster::{
    DataTypeTag, ElementType, Point, Rect, TileBuffer, TileData, TileIndex,
};
use tiled_raster::reader::{ReaderOptions, TiledReader};

/// Manifest path every mock image is registered under by default.
pub const SCENE: &str = "scene.idaho";

// =============================================================================
// Pixel Values
// =============================================================================

/// Deterministic sample for an absolute pixel of a level.
///
/// Values stay in `0..250` so they are exact in every element type.
pub fn sample_value(level: u32, x: i32, y: i32, band: u32) -> f64 {
    let v = x as i64 * 7 + y as i64 * 13 + band as i64 * 101 + level as i64 * 37;
    v.rem_euclid(250) as f64
}

pub fn rect(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Rect {
    Rect::new(min_x, min_y, max_x, max_y).unwrap()
}

pub fn proxy(level: u32, x: i32, y: i32) -> TileProxy {
    TileProxy {
        level,
        index: TileIndex { x, y },
    }
}

/// Assert every pixel of `window` carries the generated sample for `level`.
pub fn assert_window(tile: &TileBuffer, level: u32, window: Rect) {
    for band in 0..tile.bands() {
        for y in window.min_y()..=window.max_y() {
            for x in window.min_x()..=window.max_x() {
                let expected = sample_value(level, x, y, band);
                assert_eq!(
                    tile.pixel(Point::new(x, y), band),
                    Some(expected),
                    "pixel ({}, {}) band {} at level {}",
                    x,
                    y,
                    band,
                    level
                );
            }
        }
    }
}

/// Assert every pixel of `tile` outside `inside` is zero.
pub fn assert_zero_outside(tile: &TileBuffer, inside: Option<Rect>) {
    let r = tile.rect();
    for band in 0..tile.bands() {
        for y in r.min_y()..=r.max_y() {
            for x in r.min_x()..=r.max_x() {
                let p = Point::new(x, y);
                if inside.is_some_and(|i| i.contains_point(p)) {
                    continue;
                }
                assert_eq!(tile.pixel(p, band), Some(0.0), "pixel {} band {}", p, band);
            }
        }
    }
}

/// Convert generated samples to the storage type of `element_type`.
pub fn to_tile_data(element_type: ElementType, values: &[f64]) -> TileData {
    match element_type {
        ElementType::U8 => TileData::U8(values.iter().map(|&v| v as u8).collect()),
        ElementType::U16 => TileData::U16(values.iter().map(|&v| v as u16).collect()),
        ElementType::I16 => TileData::I16(values.iter().map(|&v| v as i16).collect()),
        ElementType::U32 => TileData::U32(values.iter().map(|&v| v as u32).collect()),
        ElementType::I32 => TileData::I32(values.iter().map(|&v| v as i32).collect()),
        ElementType::F32 => TileData::F32(values.iter().map(|&v| v as f32).collect()),
        ElementType::F64 => TileData::F64(values.to_vec()),
    }
}

// =============================================================================
// Mock Image
// =============================================================================

/// Description of an in-memory image served by [`MockSource`].
#[derive(Debug, Clone)]
pub struct MockImage {
    pub metadata: ImageMetadata,
    pub georeferencing: Option<Georeferencing>,
    pub histogram: Option<Histogram>,
    pub external_overviews: Vec<LevelSize>,
    /// Serve every sample with this value instead of [`sample_value`]
    pub constant: Option<f64>,
    /// Deliver edge tiles at full tile size instead of clipped to the image
    pub full_edge_tiles: bool,
}

impl MockImage {
    /// Single-band byte image at the origin.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            metadata: ImageMetadata {
                min_x: 0,
                min_y: 0,
                width,
                height,
                tile_width: tile_size,
                tile_height: tile_size,
                num_bands: 1,
                data_type: DataTypeTag::Byte,
                overviews: Vec::new(),
            },
            georeferencing: None,
            histogram: None,
            external_overviews: Vec::new(),
            constant: None,
            full_edge_tiles: false,
        }
    }

    pub fn with_bands(mut self, bands: u32) -> Self {
        self.metadata.num_bands = bands;
        self
    }

    pub fn with_data_type(mut self, data_type: DataTypeTag) -> Self {
        self.metadata.data_type = data_type;
        self
    }

    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.metadata.min_x = x;
        self.metadata.min_y = y;
        self
    }

    pub fn with_overviews(mut self, overviews: Vec<LevelSize>) -> Self {
        self.metadata.overviews = overviews;
        self
    }

    pub fn with_external_overviews(mut self, overviews: Vec<LevelSize>) -> Self {
        self.external_overviews = overviews;
        self
    }

    pub fn with_georeferencing(mut self, georef: Georeferencing) -> Self {
        self.georeferencing = Some(georef);
        self
    }

    pub fn with_histogram(mut self, min: Vec<f64>, max: Vec<f64>) -> Self {
        self.histogram = Some(Histogram { min, max });
        self
    }

    pub fn with_constant(mut self, value: f64) -> Self {
        self.constant = Some(value);
        self
    }

    pub fn with_full_edge_tiles(mut self) -> Self {
        self.full_edge_tiles = true;
        self
    }

    fn level_sizes(&self) -> Vec<LevelSize> {
        let mut sizes = vec![self.metadata.full_size()];
        sizes.extend(self.metadata.overviews.iter().copied());
        sizes.extend(self.external_overviews.iter().copied());
        sizes
    }

    /// Generate the raw tile a dataset would deliver for `proxy`.
    fn generate(&self, proxy: &TileProxy) -> Result<RawTile, DatasetError> {
        let out_of_range = || DatasetError::TileOutOfRange {
            level: proxy.level,
            tile_x: proxy.index.x,
            tile_y: proxy.index.y,
        };

        let md = &self.metadata;
        let size = *self
            .level_sizes()
            .get(proxy.level as usize)
            .ok_or_else(out_of_range)?;
        let level_rect = md.level_rect(size).ok_or_else(out_of_range)?;
        let grid = md.tile_grid().ok_or_else(out_of_range)?;
        let element_type = ElementType::from_tag(md.data_type)
            .ok_or_else(|| DatasetError::Malformed("unsupported data type".to_string()))?;

        let tile_rect = grid
            .tile_rect(grid.tile_origin(proxy.index))
            .ok_or_else(out_of_range)?;
        let clipped = tile_rect.clip_to(&level_rect).ok_or_else(out_of_range)?;
        let region = if self.full_edge_tiles { tile_rect } else { clipped };

        let bands = md.num_bands;
        let mut values = Vec::with_capacity(region.area() * bands as usize);
        for y in region.min_y()..=region.max_y() {
            for x in region.min_x()..=region.max_x() {
                for band in 0..bands {
                    values.push(
                        self.constant
                            .unwrap_or_else(|| sample_value(proxy.level, x, y, band)),
                    );
                }
            }
        }

        RawTile::new(
            region.height() as usize,
            region.width() as usize,
            bands as usize,
            to_tile_data(element_type, &values),
        )
    }
}

// =============================================================================
// Fetch Tracking
// =============================================================================

/// Shared record of tile fetches, with failure injection.
#[derive(Clone, Default)]
pub struct FetchTracker {
    fetch_count: Arc<AtomicUsize>,
    fetches: Arc<RwLock<Vec<TileProxy>>>,
    failing: Arc<Mutex<HashSet<TileProxy>>>,
}

impl FetchTracker {
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub async fn fetches(&self) -> Vec<TileProxy> {
        self.fetches.read().await.clone()
    }

    /// Number of fetches recorded for one tile.
    pub async fn fetches_of(&self, proxy: TileProxy) -> usize {
        self.fetches
            .read()
            .await
            .iter()
            .filter(|p| **p == proxy)
            .count()
    }

    /// Make fetches of `proxy` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, proxy: TileProxy) {
        self.failing.lock().unwrap().insert(proxy);
    }

    pub fn heal(&self, proxy: TileProxy) {
        self.failing.lock().unwrap().remove(&proxy);
    }

    fn is_failing(&self, proxy: &TileProxy) -> bool {
        self.failing.lock().unwrap().contains(proxy)
    }

    async fn record(&self, proxy: TileProxy) {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetches.write().await.push(proxy);
    }
}

// =============================================================================
// Mock Dataset Source
// =============================================================================

/// A dataset served from a [`MockImage`].
pub struct MockDataset {
    image: MockImage,
    tracker: FetchTracker,
    delay: Option<Duration>,
}

#[async_trait]
impl TiledDataset for MockDataset {
    fn metadata(&self) -> &ImageMetadata {
        &self.image.metadata
    }

    fn georeferencing(&self) -> Option<&Georeferencing> {
        self.image.georeferencing.as_ref()
    }

    fn histogram(&self) -> Option<&Histogram> {
        self.image.histogram.as_ref()
    }

    fn external_overviews(&self) -> &[LevelSize] {
        &self.image.external_overviews
    }

    async fn fetch_raw_tile(&self, proxy: &TileProxy) -> Result<RawTile, DatasetError> {
        self.tracker.record(*proxy).await;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.tracker.is_failing(proxy) {
            return Err(DatasetError::Io(format!(
                "injected failure for tile {:?} at level {}",
                proxy.index, proxy.level
            )));
        }
        self.image.generate(proxy)
    }
}

/// A mock dataset source for testing.
///
/// Clones share the fetch tracker, so a test can keep a handle while the
/// reader owns the source.
#[derive(Clone, Default)]
pub struct MockSource {
    images: HashMap<PathBuf, MockImage>,
    tracker: FetchTracker,
    delay: Option<Duration>,
    load_count: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, image: MockImage) -> Self {
        self.images.insert(path.into(), image);
        self
    }

    /// Delay every tile fetch, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn tracker(&self) -> FetchTracker {
        self.tracker.clone()
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for MockSource {
    type Dataset = MockDataset;

    async fn load(&self, path: &Path) -> Result<Self::Dataset, DatasetError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let image = self
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| DatasetError::NotFound(path.display().to_string()))?;
        Ok(MockDataset {
            image,
            tracker: self.tracker.clone(),
            delay: self.delay,
        })
    }
}

/// Open `image` as [`SCENE`] in a fresh reader.
pub async fn open_mock(image: MockImage) -> (TiledReader<MockSource>, FetchTracker) {
    open_source(MockSource::new().with_image(SCENE, image), ReaderOptions::default()).await
}

/// Open [`SCENE`] from `source` with `options`.
pub async fn open_source(
    source: MockSource,
    options: ReaderOptions,
) -> (TiledReader<MockSource>, FetchTracker) {
    let tracker = source.tracker();
    let mut reader = TiledReader::with_options(source, options);
    reader.open(SCENE).await.unwrap();
    (reader, tracker)
}

// =============================================================================
// Filesystem Datasets
// =============================================================================

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "tiled-raster-it-{}-{}-{}",
        name,
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a manifest and every level-0 tile of a single-band `u16` image.
///
/// Tiles are stored clipped to the image, with samples from
/// [`sample_value`]. Returns the manifest path.
pub fn write_u16_dataset(dir: &Path, width: u32, height: u32, tile_size: u32) -> PathBuf {
    let manifest = format!(
        r#"{{
            "image": {{
                "width": {width}, "height": {height},
                "tile_width": {tile_size}, "tile_height": {tile_size},
                "num_bands": 1, "data_type": "unsigned_short"
            }},
            "georeferencing": {{
                "spatial_reference_system_code": "EPSG:32611",
                "translate_x": 500000.0, "scale_x": 0.5,
                "translate_y": 4000000.0, "scale_y": -0.5
            }},
            "histogram": {{ "min": [0], "max": [249] }}
        }}"#
    );
    let path = dir.join("scene.idaho");
    std::fs::write(&path, manifest).unwrap();
    std::fs::create_dir_all(dir.join("tiles/0")).unwrap();

    let image = rect(0, 0, width as i32 - 1, height as i32 - 1);
    let ts = tile_size as i32;
    for ty in 0..(height as i32 + ts - 1) / ts {
        for tx in 0..(width as i32 + ts - 1) / ts {
            let cell = rect(tx * ts, ty * ts, tx * ts + ts - 1, ty * ts + ts - 1);
            let region = cell.clip_to(&image).unwrap();
            let mut bytes = Vec::with_capacity(region.area() * 2);
            for y in region.min_y()..=region.max_y() {
                for x in region.min_x()..=region.max_x() {
                    bytes.extend_from_slice(&(sample_value(0, x, y, 0) as u16).to_le_bytes());
                }
            }
            std::fs::write(dir.join(format!("tiles/0/{}_{}.raw", tx, ty)), bytes).unwrap();
        }
    }
    path
}

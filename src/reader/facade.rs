//! Tiled reader facade.
//!
//! [`TiledReader`] turns arbitrary pixel rectangle requests at any resolution
//! level into native tile fetches:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         get_tile(rect, level)                   │
//! │  1. Check open / enabled / level   4. Cache lookup per origin   │
//! │  2. Clip rect to level image       5. Fetch + materialize miss  │
//! │  3. Tile origins of the clip       6. Project into output       │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                          │                   │
//!            ▼                          ▼                   ▼
//!     ┌──────────────┐         ┌───────────────┐   ┌──────────────┐
//!     │ TiledDataset │         │ TileCache (per│   │ copy_window  │
//!     │              │         │ level)        │   │              │
//!     └──────────────┘         └───────────────┘   └──────────────┘
//! ```
//!
//! Open and close take `&mut self`; tile reads take `&self`, so an opened
//! reader can be shared across tasks behind an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::dataset::{DatasetSource, ImageMetadata, LevelSize, TiledDataset};
use crate::error::{DatasetError, GeometryError, InvariantViolation, OpenError, TileError};
use crate::geo::{
    internal_projection, sidecar_path, DPoint, EpsgProjectionFactory, GeometrySource,
    ImageGeometry, NoSidecar, ProjectionFactory, SidecarGeometry,
};
use crate::raster::{DataStatus, ElementType, Point, Rect, TileBuffer, TileGrid};
use crate::tile::{copy_window, materialize, CacheEntry, CachePolicy, CacheStats, TileCache};

use super::decimation::DecimationTable;
use super::registry::{handles_extension, path_extension};

/// Short reader name.
pub const SHORT_NAME: &str = "tiled_raster_reader";

/// Descriptive reader name.
pub const LONG_NAME: &str = "tiled raster reader";

/// Library-side reader settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Bounds applied to each resolution level's tile cache
    pub cache_policy: CachePolicy,
}

// =============================================================================
// Open dataset state
// =============================================================================

struct Level {
    size: LevelSize,
    rect: Rect,
    cache: Arc<TileCache>,
}

/// Everything that exists only while a dataset is open.
struct OpenDataset<D: TiledDataset> {
    path: PathBuf,
    dataset: Arc<D>,
    element_type: ElementType,
    bands: u32,
    grid: TileGrid,
    levels: Vec<Level>,
    decimation: DecimationTable,
    geometry: OnceCell<Arc<ImageGeometry>>,
}

impl<D: TiledDataset + 'static> OpenDataset<D> {
    fn new(path: &Path, dataset: D, options: &ReaderOptions) -> Result<Self, OpenError> {
        let md = dataset.metadata();

        if md.width == 0 || md.height == 0 {
            return Err(OpenError::ZeroDimensions {
                width: md.width,
                height: md.height,
            });
        }
        let grid = md.tile_grid().ok_or(OpenError::InvalidTileSize {
            tile_width: md.tile_width,
            tile_height: md.tile_height,
        })?;
        let bands = md.num_bands;
        if bands == 0 {
            return Err(OpenError::NoBands);
        }
        let element_type =
            ElementType::from_tag(md.data_type).ok_or(OpenError::UnsupportedElementType(md.data_type))?;

        let mut sizes = vec![md.full_size()];
        sizes.extend(md.overviews.iter().copied());
        sizes.extend(dataset.external_overviews().iter().copied());

        let levels = sizes
            .iter()
            .enumerate()
            .map(|(level, &size)| build_level(md, level, size, grid, options.cache_policy))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            element_type,
            bands,
            grid,
            levels,
            decimation: DecimationTable::new(sizes),
            geometry: OnceCell::new(),
            dataset: Arc::new(dataset),
        })
    }

    fn metadata(&self) -> &ImageMetadata {
        self.dataset.metadata()
    }

    fn level(&self, level: u32) -> Result<&Level, TileError> {
        self.levels
            .get(level as usize)
            .ok_or(TileError::InvalidLevel {
                level,
                levels: self.levels.len() as u32,
            })
    }
}

fn build_level(
    md: &ImageMetadata,
    level: usize,
    size: LevelSize,
    grid: TileGrid,
    policy: CachePolicy,
) -> Result<Level, OpenError> {
    let rect = md.level_rect(size).ok_or_else(|| {
        OpenError::Load(DatasetError::Malformed(format!(
            "level {} has unusable size {}x{}",
            level, size.width, size.height
        )))
    })?;
    Ok(Level {
        size,
        rect,
        cache: Arc::new(TileCache::with_policy(rect, grid, policy)),
    })
}

// =============================================================================
// TiledReader
// =============================================================================

/// Decimation-aware tiled raster reader with a per-level tile cache.
pub struct TiledReader<S: DatasetSource> {
    source: S,
    options: ReaderOptions,
    projections: Arc<dyn ProjectionFactory>,
    sidecar: Arc<dyn SidecarGeometry>,
    enabled: AtomicBool,
    open: Option<OpenDataset<S::Dataset>>,
}

impl<S: DatasetSource> TiledReader<S> {
    /// Create a closed reader with an unbounded cache.
    pub fn new(source: S) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: S, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            projections: Arc::new(EpsgProjectionFactory),
            sidecar: Arc::new(NoSidecar),
            enabled: AtomicBool::new(true),
            open: None,
        }
    }

    pub fn with_projection_factory(mut self, factory: Arc<dyn ProjectionFactory>) -> Self {
        self.projections = factory;
        self
    }

    pub fn with_sidecar(mut self, sidecar: Arc<dyn SidecarGeometry>) -> Self {
        self.sidecar = sidecar;
        self
    }

    pub fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    pub fn long_name(&self) -> &'static str {
        LONG_NAME
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Open the dataset at `path`, closing any dataset already open.
    ///
    /// On failure the reader is left closed.
    pub async fn open(&mut self, path: impl AsRef<Path>) -> Result<(), OpenError> {
        let path = path.as_ref();
        if self.open.is_some() {
            self.close();
        }

        if !handles_extension(&path_extension(path)) {
            return Err(OpenError::UnsupportedExtension {
                path: path.display().to_string(),
            });
        }

        debug!(path = %path.display(), "loading dataset");
        let dataset = self.source.load(path).await?;
        let open = OpenDataset::new(path, dataset, &self.options)?;

        let md = open.metadata();
        info!(
            path = %path.display(),
            width = md.width,
            height = md.height,
            tile_width = md.tile_width,
            tile_height = md.tile_height,
            bands = open.bands,
            element_type = %open.element_type,
            levels = open.levels.len(),
            "opened dataset"
        );

        self.open = Some(open);
        Ok(())
    }

    /// Drop the dataset, its caches, decimation table and geometry.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            info!(path = %open.path.display(), "closed dataset");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Path of the open dataset.
    pub fn path(&self) -> Option<&Path> {
        self.open.as_ref().map(|o| o.path.as_path())
    }

    /// The open dataset's collaborator.
    pub fn dataset(&self) -> Option<&S::Dataset> {
        self.open.as_ref().map(|o| o.dataset.as_ref())
    }

    pub fn set_source_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_source_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Image description
    // -------------------------------------------------------------------------

    /// Full-resolution image rectangle.
    pub fn image_rect(&self) -> Option<Rect> {
        self.open
            .as_ref()
            .and_then(|o| o.levels.first())
            .map(|l| l.rect)
    }

    /// Image rectangle of a resolution level.
    pub fn level_rect(&self, level: u32) -> Option<Rect> {
        let open = self.open.as_ref()?;
        open.level(level).ok().map(|l| l.rect)
    }

    pub fn tile_grid(&self) -> Option<TileGrid> {
        self.open.as_ref().map(|o| o.grid)
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_grid().map_or(0, |g| g.tile_width())
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_grid().map_or(0, |g| g.tile_height())
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.open.as_ref().map(|o| o.element_type)
    }

    pub fn number_of_input_bands(&self) -> u32 {
        self.open.as_ref().map_or(0, |o| o.bands)
    }

    /// Same as the input band count; the reader does no band selection.
    pub fn number_of_output_bands(&self) -> u32 {
        self.number_of_input_bands()
    }

    pub fn number_of_lines(&self, level: u32) -> u32 {
        self.level_size(level).map_or(0, |s| s.height)
    }

    pub fn number_of_samples(&self, level: u32) -> u32 {
        self.level_size(level).map_or(0, |s| s.width)
    }

    fn level_size(&self, level: u32) -> Option<LevelSize> {
        let open = self.open.as_ref()?;
        open.level(level).ok().map(|l| l.size)
    }

    /// Full resolution plus internal and external overviews.
    pub fn number_of_decimation_levels(&self) -> u32 {
        self.open.as_ref().map_or(0, |o| o.levels.len() as u32)
    }

    pub fn is_valid_level(&self, level: u32) -> bool {
        level < self.number_of_decimation_levels()
    }

    /// Scale factor of `level` relative to full resolution.
    pub fn decimation_factor(&self, level: u32) -> Option<DPoint> {
        self.open.as_ref()?.decimation.factor(level)
    }

    /// Factors for every level; empty when not open or undeterminable.
    pub fn decimation_factors(&self) -> Vec<DPoint> {
        self.open
            .as_ref()
            .map(|o| o.decimation.factors().to_vec())
            .unwrap_or_default()
    }

    pub fn min_pixel_value(&self, band: u32) -> Option<f64> {
        self.dataset()?.histogram()?.min(band)
    }

    pub fn max_pixel_value(&self, band: u32) -> Option<f64> {
        self.dataset()?.histogram()?.max(band)
    }

    /// Counters of one level's tile cache.
    pub async fn cache_stats(&self, level: u32) -> Option<CacheStats> {
        let open = self.open.as_ref()?;
        let level = open.level(level).ok()?;
        Some(level.cache.stats().await)
    }

    // -------------------------------------------------------------------------
    // Tile access
    // -------------------------------------------------------------------------

    /// Read `rect` at `level`, degrading every failure to a blank buffer.
    ///
    /// Without an open dataset the result has status [`DataStatus::Null`] and
    /// no bands. Disabled sources, invalid levels, requests outside the image
    /// and fetch failures yield a zeroed buffer of the requested shape with
    /// status [`DataStatus::Empty`].
    pub async fn get_tile(&self, rect: Rect, level: u32) -> TileBuffer {
        let Some(open) = self.open.as_ref() else {
            return TileBuffer::null(rect);
        };

        let mut tile = TileBuffer::new(rect, open.bands, open.element_type);
        if let Err(e) = self.get_tile_into(&mut tile, level).await {
            match e {
                TileError::SourceDisabled | TileError::InvalidLevel { .. } => {
                    debug!(%rect, level, error = %e, "returning blank tile")
                }
                _ => warn!(%rect, level, error = %e, "tile read failed, returning blank tile"),
            }
        }
        tile
    }

    /// Read `rect` at `level`, reporting failures.
    pub async fn try_get_tile(&self, rect: Rect, level: u32) -> Result<TileBuffer, TileError> {
        let open = self.open.as_ref().ok_or(TileError::NotOpen)?;
        let mut tile = TileBuffer::new(rect, open.bands, open.element_type);
        self.get_tile_into(&mut tile, level).await?;
        Ok(tile)
    }

    /// Fill a caller-owned buffer covering the rectangle it was created for.
    ///
    /// On failure the buffer is left blank rather than partially filled.
    pub async fn get_tile_into(&self, tile: &mut TileBuffer, level: u32) -> Result<(), TileError> {
        let result = self.fill(tile, level).await;
        if result.is_err() {
            tile.make_blank();
        }
        result
    }

    async fn fill(&self, tile: &mut TileBuffer, level: u32) -> Result<(), TileError> {
        let open = self.open.as_ref().ok_or(TileError::NotOpen)?;
        if !self.is_source_enabled() {
            return Err(TileError::SourceDisabled);
        }
        let lvl = open.level(level)?;

        if tile.element_type() != open.element_type {
            return Err(InvariantViolation::ElementTypeMismatch {
                expected: open.element_type,
                actual: tile.element_type(),
            }
            .into());
        }
        if tile.bands() != open.bands {
            return Err(InvariantViolation::BandCountMismatch {
                expected: open.bands,
                actual: tile.bands(),
            }
            .into());
        }

        tile.make_blank();
        let request = tile.rect();
        let Some(clipped) = request.clip_to(&lvl.rect) else {
            debug!(%request, level, "request outside image");
            return Ok(());
        };

        for origin in clipped.tile_origins(open.grid) {
            let entry = self.cached_tile(open, level, lvl, origin).await?;
            let window = entry.rect().clip_to(&clipped).ok_or(InvariantViolation::NotContained {
                outer: entry.rect(),
                inner: clipped,
            })?;
            copy_window(entry.buffer(), window, tile)?;
        }

        tile.set_status(if clipped == request {
            DataStatus::Full
        } else {
            DataStatus::Partial
        });
        Ok(())
    }

    /// Cached tile at `origin`, fetching and materializing it on a miss.
    async fn cached_tile(
        &self,
        open: &OpenDataset<S::Dataset>,
        level: u32,
        lvl: &Level,
        origin: Point,
    ) -> Result<Arc<CacheEntry>, TileError> {
        let tile_rect = open.grid.tile_rect(origin).ok_or(InvariantViolation::MisalignedEntry {
            rect: lvl.rect,
            image: lvl.rect,
        })?;

        let dataset = Arc::clone(&open.dataset);
        let proxy = dataset.tile_proxy(level, open.grid.tile_index_of(origin));
        let level_rect = lvl.rect;
        let (bands, element_type) = (open.bands, open.element_type);

        let fetch = async move {
            let raw = dataset.fetch_raw_tile(&proxy).await?;

            // Full-size tiles start at the cell origin; clipped edge tiles
            // start where the cell enters the image
            let full = raw.rows() == tile_rect.height() as usize
                && raw.cols() == tile_rect.width() as usize;
            let at = match tile_rect.clip_to(&level_rect) {
                Some(inside) if !full => inside.origin(),
                _ => tile_rect.origin(),
            };

            let mut buffer = TileBuffer::new(tile_rect, bands, element_type);
            materialize(&raw, at, &mut buffer)?;
            debug!(level, %origin, "materialized tile");
            Ok::<_, TileError>(CacheEntry::new(buffer))
        };

        lvl.cache.get_or_fetch(origin, fetch).await
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    /// Image geometry, resolved once per open.
    ///
    /// A sidecar projection (`<path>.aux.xml`) wins over the dataset's own
    /// georeferencing.
    pub async fn image_geometry(&self) -> Result<Arc<ImageGeometry>, GeometryError> {
        let open = self.open.as_ref().ok_or(GeometryError::NotOpen)?;
        open.geometry
            .get_or_try_init(|| self.resolve_geometry(open))
            .await
            .cloned()
    }

    async fn resolve_geometry(
        &self,
        open: &OpenDataset<S::Dataset>,
    ) -> Result<Arc<ImageGeometry>, GeometryError> {
        let size = open.metadata().full_size();
        let decimations = open.decimation.factors().to_vec();

        let sidecar = sidecar_path(&open.path);
        if tokio::fs::try_exists(&sidecar).await.unwrap_or(false) {
            if let Some(projection) = self.sidecar.projection(&sidecar) {
                debug!(path = %sidecar.display(), "using sidecar geometry");
                return Ok(Arc::new(ImageGeometry::new(
                    projection,
                    GeometrySource::Sidecar,
                    size,
                    decimations,
                )));
            }
        }

        let georef = open
            .dataset
            .georeferencing()
            .ok_or(GeometryError::MissingGeoreferencing)?;
        let projection = internal_projection(georef, self.projections.as_ref(), size.width, size.height)?;

        Ok(Arc::new(ImageGeometry::new(
            projection,
            GeometrySource::Internal,
            size,
            decimations,
        )))
    }
}

//! # Tiled Raster
//!
//! A decimation-aware tiled raster reader with a decoded tile cache.
//!
//! Callers ask for arbitrary pixel rectangles at any resolution level. The
//! reader maps each request onto the dataset's native tile grid, fetches
//! missing tiles from a dataset collaborator, caches the decoded tiles by
//! origin and copies exactly the requested window into the caller's buffer.
//!
//! ## Features
//!
//! - **Any rectangle, any level**: requests are clipped to the image and may
//!   span any number of native tiles
//! - **One fetch per tile**: concurrent requests for the same missing tile
//!   share a single decode
//! - **Seven sample types**: `u8`, `u16`, `i16`, `u32`, `i32`, `f32` and `f64`,
//!   copied without conversion
//! - **Geometry**: projection origin and pixel size derived from affine
//!   georeferencing, with sidecar override
//!
//! ## Architecture
//!
//! - [`raster`] - Rectangles, tile grid arithmetic, sample types and buffers
//! - [`dataset`] - Dataset collaborator traits and a local manifest backend
//! - [`tile`] - Tile cache, materialization and window copy
//! - [`geo`] - Georeferencing transform and projection seam
//! - [`reader`] - Reader facade, decimation table and registry
//! - [`config`] - CLI configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tiled_raster::{LocalSource, Rect, ReaderRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ReaderRegistry::new(LocalSource::new());
//!     let reader = registry.open("scene.idaho").await.expect("open");
//!
//!     let rect = Rect::new(300, 300, 500, 500).expect("rect");
//!     let tile = reader.get_tile(rect, 0).await;
//!     println!("{:?}: {} bands", tile.status(), tile.bands());
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod raster;
pub mod reader;
pub mod tile;

// Re-export commonly used types
pub use config::{parse_rect, CacheArgs, Cli, Command, InfoConfig, ReadConfig};
pub use dataset::{
    DatasetSource, Georeferencing, Histogram, ImageMetadata, LevelSize, LocalDataset, LocalSource,
    RawTile, TileProxy, TiledDataset,
};
pub use error::{DatasetError, GeometryError, InvariantViolation, OpenError, TileError};
pub use geo::{
    compute_projection_origin, DPoint, EpsgProjectionFactory, GeoTransform, GroundPoint,
    ImageGeometry, NoSidecar, Projection, ProjectionFactory, SidecarGeometry,
};
pub use raster::{
    DataStatus, DataTypeTag, Element, ElementType, Point, Rect, TileBuffer, TileData, TileGrid,
    TileIndex,
};
pub use reader::{DecimationTable, ReaderOptions, ReaderRegistry, TiledReader};
pub use tile::{CacheEntry, CachePolicy, CacheStats, TileCache};

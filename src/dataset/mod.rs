//! Tiled dataset collaborator seam.
//!
//! The reader never decodes a storage format itself. It consumes a
//! [`DatasetSource`] that loads a path into a [`TiledDataset`], which in turn
//! exposes read-only metadata and hands back decoded [`RawTile`]s.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TiledReader                │
//! └────────────────────┬────────────────────┘
//!                      │ load(path) / fetch_raw_tile(proxy)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     DatasetSource -> TiledDataset       │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  LocalDataset   │    │  other backends     │
//! │ (manifest+raw)  │    │  (implemented out   │
//! │                 │    │   of crate)         │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod local;
mod metadata;
mod source;

pub use local::{LocalDataset, LocalSource, DEFAULT_TILE_PATTERN};
pub use metadata::{Georeferencing, Histogram, ImageMetadata, LevelSize};
pub use source::{DatasetSource, RawTile, TileProxy, TiledDataset};

//! Tile cache and pixel movement.
//!
//! This module holds everything between a decoded raw tile and the caller's
//! output buffer:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            TiledDataset                 │
//! └────────────────────┬────────────────────┘
//!                      │ RawTile ([row][col][band])
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  materialize  ->  TileCache             │
//! │  (band-sequential, keyed by origin,     │
//! │   one fetch per origin in flight)       │
//! └────────────────────┬────────────────────┘
//!                      │ Arc<CacheEntry>
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  project / copy_window -> TileBuffer    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCache`]: per-level cache of decoded tile-aligned buffers
//! - [`CachePolicy`]: optional byte and entry bounds with LRU eviction
//! - [`materialize`]: interleaved raw tile into a band-sequential buffer
//! - [`project`] and [`copy_window`]: window copy out of a cached buffer

mod cache;
mod materialize;
mod project;

pub use cache::{CacheEntry, CachePolicy, CacheStats, TileCache, DEFAULT_MAX_ENTRIES};
pub use materialize::materialize;
pub use project::{copy_window, project};

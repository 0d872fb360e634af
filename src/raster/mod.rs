//! Raster primitives shared by the cache, the dataset seam and the reader.
//!
//! - [`Rect`], [`Point`], [`TileGrid`]: pixel rectangles and tile-grid arithmetic
//! - [`ElementType`], [`DataTypeTag`], [`Element`]: the supported sample types
//! - [`TileData`]: typed band-sequential sample storage
//! - [`TileBuffer`]: a caller-facing pixel buffer with a [`DataStatus`]

mod buffer;
mod element;
mod rect;

pub use buffer::{DataStatus, TileBuffer};
pub use element::{DataTypeTag, Element, ElementType, TileData};
pub use rect::{Point, Rect, TileGrid, TileIndex};

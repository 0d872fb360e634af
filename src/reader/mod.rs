//! Reader facade, decimation table and reader registry.
//!
//! - [`TiledReader`]: opens one dataset and serves pixel rectangles at any
//!   resolution level through a per-level [`TileCache`](crate::tile::TileCache)
//! - [`DecimationTable`]: per-level scale factors, computed once per open
//! - [`ReaderRegistry`]: explicit factory answering extension and MIME type
//!   questions and producing opened readers

mod decimation;
mod facade;
mod registry;

pub use decimation::DecimationTable;
pub use facade::{ReaderOptions, TiledReader, LONG_NAME, SHORT_NAME};
pub use registry::{handles_extension, ReaderRegistry, EXTENSION, MIME_TYPE, TYPE_NAME};

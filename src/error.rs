use thiserror::Error;

use crate::raster::{DataTypeTag, ElementType, Rect};

/// Errors reported by a tiled dataset collaborator.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// Dataset or tile resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying read failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Dataset content could not be interpreted
    #[error("Malformed dataset: {0}")]
    Malformed(String),

    /// Tile coordinates outside the dataset's tile grid
    #[error("Tile ({tile_x}, {tile_y}) out of range at level {level}")]
    TileOutOfRange { level: u32, tile_x: i32, tile_y: i32 },
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DatasetError::NotFound(err.to_string()),
            _ => DatasetError::Io(err.to_string()),
        }
    }
}

/// Fatal errors raised while opening a dataset.
///
/// A reader that fails to open retains no partial state.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// Path is not handled by this reader
    #[error("Unsupported extension: {path}")]
    UnsupportedExtension { path: String },

    /// The dataset collaborator could not load the path
    #[error("Dataset load failed: {0}")]
    Load(#[from] DatasetError),

    /// Image metadata reports a zero width or height
    #[error("Image metadata has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    /// Native tile size must be positive in both directions
    #[error("Invalid tile size {tile_width}x{tile_height}")]
    InvalidTileSize { tile_width: u32, tile_height: u32 },

    /// Image has no bands
    #[error("Image metadata reports zero bands")]
    NoBands,

    /// Element type tag has no supported numeric representation
    #[error("Unsupported element type: {0:?}")]
    UnsupportedElementType(DataTypeTag),
}

/// Internal invariant violations.
///
/// These indicate a logic defect upstream, never bad input data. They abort
/// the current operation instead of producing wrong pixels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Window copy requested outside the source rectangle
    #[error("Rectangle {inner} is not fully contained in {outer}")]
    NotContained { outer: Rect, inner: Rect },

    /// Source and destination buffers hold different element types
    #[error("Element type mismatch: expected {expected}, found {actual}")]
    ElementTypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },

    /// Source and destination buffers hold different band counts
    #[error("Band count mismatch: expected {expected}, found {actual}")]
    BandCountMismatch { expected: u32, actual: u32 },

    /// Cache entry is not a single grid cell touching the cached image
    #[error("Cache entry {rect} is not a tile of image {image}")]
    MisalignedEntry { rect: Rect, image: Rect },
}

/// Errors that can occur while serving a tile request.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// No dataset is open
    #[error("Reader is not open")]
    NotOpen,

    /// The reader has been disabled as a tile source
    #[error("Tile source is disabled")]
    SourceDisabled,

    /// Resolution level out of range
    #[error("Invalid resolution level {level}: reader has {levels} levels")]
    InvalidLevel { level: u32, levels: u32 },

    /// Tile fetch from the dataset failed
    #[error("Tile fetch failed: {0}")]
    Fetch(#[from] DatasetError),

    /// Raw tile does not fit the cache rectangle it was fetched for
    #[error("Raw tile shape {rows}x{cols}x{bands} does not fit {expected}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        bands: usize,
        expected: String,
    },

    /// The task populating a tile terminated before publishing a result
    #[error("Tile fetch aborted: {0}")]
    FetchAborted(String),

    /// Internal invariant violated
    #[error("Internal invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl TileError {
    /// Whether this error signals a logic defect rather than a data error.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, TileError::Invariant(_))
    }
}

/// Errors that can occur while resolving image geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// No dataset is open
    #[error("Reader is not open")]
    NotOpen,

    /// Dataset carries no georeferencing and no sidecar override exists
    #[error("Dataset has no georeferencing")]
    MissingGeoreferencing,

    /// Projection factory does not know the spatial reference code
    #[error("Unknown spatial reference: {0}")]
    UnknownSpatialReference(String),

    /// Origin derivation only supports lat/lon cylindrical projections
    #[error("Cannot derive origin for projection '{0}'")]
    UnsupportedProjectionForOrigin(String),
}

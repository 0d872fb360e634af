//! Explicit reader factory.
//!
//! The registry is built once at startup and passed by reference to whatever
//! needs to open images. It answers format questions (extension, MIME type)
//! and produces opened [`TiledReader`]s.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::dataset::DatasetSource;
use crate::error::OpenError;
use crate::geo::{EpsgProjectionFactory, NoSidecar, ProjectionFactory, SidecarGeometry};

use super::facade::{ReaderOptions, TiledReader};

/// Manifest extension handled by the reader.
pub const EXTENSION: &str = "idaho";

/// MIME type handled by the reader.
pub const MIME_TYPE: &str = "image/idaho";

/// Reader type name reported by the registry.
pub const TYPE_NAME: &str = "TiledReader";

/// Whether a file extension names a dataset the reader can open.
///
/// Accepts `idaho` in any case, or a compound extension carrying both a
/// `graph-id` and a `node-id`.
pub fn handles_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    ext == EXTENSION || (ext.contains("graph-id") && ext.contains("node-id"))
}

pub(crate) fn path_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Factory for [`TiledReader`]s over one dataset source.
pub struct ReaderRegistry<S: DatasetSource + Clone> {
    source: S,
    options: ReaderOptions,
    projections: Arc<dyn ProjectionFactory>,
    sidecar: Arc<dyn SidecarGeometry>,
}

impl<S: DatasetSource + Clone> ReaderRegistry<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: S, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            projections: Arc::new(EpsgProjectionFactory),
            sidecar: Arc::new(NoSidecar),
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

    pub fn supported_extensions(&self) -> &'static [&'static str] {
        &[EXTENSION]
    }

    pub fn type_names(&self) -> &'static [&'static str] {
        &[TYPE_NAME]
    }

    pub fn handles_extension(&self, ext: &str) -> bool {
        handles_extension(ext)
    }

    pub fn handles_mime_type(&self, mime: &str) -> bool {
        mime.eq_ignore_ascii_case(MIME_TYPE)
    }

    /// Whether the registry refuses to try `path`.
    ///
    /// Only plain `.idaho` paths are tried.
    pub fn has_excluded_extension(&self, path: &Path) -> bool {
        !path_extension(path).eq_ignore_ascii_case(EXTENSION)
    }

    /// A closed reader configured like this registry.
    pub fn create_reader(&self) -> TiledReader<S> {
        TiledReader::with_options(self.source.clone(), self.options)
            .with_projection_factory(Arc::clone(&self.projections))
            .with_sidecar(Arc::clone(&self.sidecar))
    }

    /// Open `path` in a new reader.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<TiledReader<S>, OpenError> {
        let path = path.as_ref();
        if self.has_excluded_extension(path) {
            debug!(path = %path.display(), "excluded extension");
            return Err(OpenError::UnsupportedExtension {
                path: path.display().to_string(),
            });
        }

        let mut reader = self.create_reader();
        reader.open(path).await?;
        Ok(reader)
    }
}

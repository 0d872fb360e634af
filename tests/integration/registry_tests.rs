//! Registry and filesystem dataset integration tests.
//!
//! Tests verify:
//! - The registry answers extension and MIME type questions
//! - Excluded extensions are rejected before any load
//! - Readers opened through the registry carry its cache policy
//! - A manifest dataset on disk reads end to end

use std::num::NonZeroUsize;

use tiled_raster::dataset::LocalSource;
use tiled_raster::error::{DatasetError, OpenError};
use tiled_raster::geo::ProjectionUnits;
use tiled_raster::raster::{DataStatus, ElementType};
use tiled_raster::reader::{ReaderOptions, ReaderRegistry, EXTENSION, MIME_TYPE, TYPE_NAME};
use tiled_raster::tile::CachePolicy;

use super::test_utils::{
    assert_window, assert_zero_outside, rect, scratch_dir, write_u16_dataset, MockImage,
    MockSource, SCENE,
};

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registry_formats() {
    let registry = ReaderRegistry::new(MockSource::new());

    assert_eq!(registry.supported_extensions(), &[EXTENSION]);
    assert_eq!(registry.type_names(), &[TYPE_NAME]);
    assert!(registry.handles_extension("idaho"));
    assert!(!registry.handles_extension("tif"));
    assert!(registry.handles_mime_type(MIME_TYPE));
    assert!(!registry.handles_mime_type("image/tiff"));

    assert!(!registry.has_excluded_extension(std::path::Path::new("a/scene.idaho")));
    assert!(registry.has_excluded_extension(std::path::Path::new("a/scene.tif")));
    assert!(registry.has_excluded_extension(std::path::Path::new("a/scene")));
}

#[tokio::test]
async fn test_registry_rejects_excluded_extension() {
    let source = MockSource::new().with_image("scene.tif", MockImage::new(10, 10, 8));
    let registry = ReaderRegistry::new(source.clone());

    let err = registry.open("scene.tif").await.err().unwrap();
    assert!(matches!(err, OpenError::UnsupportedExtension { .. }));
    assert_eq!(source.load_count(), 0);
}

#[tokio::test]
async fn test_registry_opens_with_options() {
    let policy = CachePolicy::unbounded().with_max_entries(NonZeroUsize::new(3).unwrap());
    let source = MockSource::new().with_image(SCENE, MockImage::new(1000, 1000, 256));
    let registry = ReaderRegistry::with_options(source, ReaderOptions { cache_policy: policy });

    let reader = registry.open(SCENE).await.unwrap();
    assert!(reader.is_open());
    assert_eq!(reader.options().cache_policy, policy);

    reader.get_tile(rect(0, 0, 999, 0), 0).await;
    assert_eq!(reader.cache_stats(0).await.unwrap().entries, 3);

    // Each reader owns its caches
    let other = registry.create_reader();
    assert!(!other.is_open());
    assert!(other.cache_stats(0).await.is_none());
}

#[tokio::test]
async fn test_registry_open_missing_dataset() {
    let registry = ReaderRegistry::new(MockSource::new());
    let err = registry.open("missing.idaho").await.err().unwrap();
    assert!(matches!(err, OpenError::Load(DatasetError::NotFound(_))));
}

// =============================================================================
// Filesystem Dataset
// =============================================================================

#[tokio::test]
async fn test_local_dataset_end_to_end() {
    let dir = scratch_dir("local");
    let path = write_u16_dataset(&dir, 300, 200, 128);

    let registry = ReaderRegistry::new(LocalSource::new());
    let reader = registry.open(&path).await.unwrap();

    assert_eq!(reader.image_rect(), Some(rect(0, 0, 299, 199)));
    assert_eq!(reader.element_type(), Some(ElementType::U16));
    assert_eq!(reader.number_of_decimation_levels(), 1);
    assert_eq!(reader.max_pixel_value(0), Some(249.0));

    let request = rect(100, 100, 299, 199);
    let tile = reader.try_get_tile(request, 0).await.unwrap();
    assert_eq!(tile.status(), DataStatus::Full);
    assert_window(&tile, 0, request);

    // Clipped edge tiles land at the image edge
    let request = rect(250, 150, 330, 230);
    let tile = reader.get_tile(request, 0).await;
    let inside = rect(250, 150, 299, 199);
    assert_eq!(tile.status(), DataStatus::Partial);
    assert_window(&tile, 0, inside);
    assert_zero_outside(&tile, Some(inside));

    let geometry = reader.image_geometry().await.unwrap();
    assert_eq!(geometry.projection().units(), ProjectionUnits::Meters);
}

#[tokio::test]
async fn test_local_dataset_missing_tile_is_blank() {
    let dir = scratch_dir("local-missing");
    let path = write_u16_dataset(&dir, 300, 200, 128);
    std::fs::remove_file(dir.join("tiles/0/1_1.raw")).unwrap();

    let registry = ReaderRegistry::new(LocalSource::new());
    let reader = registry.open(&path).await.unwrap();

    let request = rect(0, 0, 9, 9);
    let tile = reader.get_tile(request, 0).await;
    assert_eq!(tile.status(), DataStatus::Full);

    let tile = reader.get_tile(rect(120, 120, 140, 140), 0).await;
    assert_eq!(tile.status(), DataStatus::Empty);
    assert!(tile.is_blank());

    let err = reader.try_get_tile(rect(130, 130, 140, 140), 0).await.unwrap_err();
    assert!(matches!(err, tiled_raster::TileError::Fetch(DatasetError::NotFound(_))));
}

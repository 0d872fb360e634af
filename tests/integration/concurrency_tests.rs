//! Concurrent access integration tests.
//!
//! Tests verify:
//! - Concurrent requests for one missing tile decode it once
//! - Concurrent requests for different tiles proceed independently
//! - A failed shared fetch reaches every waiter and is not cached
//! - Cancelling the requesting task does not waste a started fetch

use std::sync::Arc;
use std::time::Duration;

use tiled_raster::raster::DataStatus;
use tiled_raster::reader::ReaderOptions;

use super::test_utils::{
    assert_window, open_source, proxy, rect, MockImage, MockSource, SCENE,
};

fn slow_source(delay_ms: u64) -> MockSource {
    MockSource::new()
        .with_image(SCENE, MockImage::new(1000, 1000, 256))
        .with_delay(Duration::from_millis(delay_ms))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_tile_fetches_once() {
    let (reader, tracker) = open_source(slow_source(50), ReaderOptions::default()).await;
    let reader = Arc::new(reader);
    let request = rect(300, 300, 500, 500);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { reader.get_tile(request, 0).await })
        })
        .collect();

    let mut tiles = Vec::new();
    for handle in handles {
        tiles.push(handle.await.unwrap());
    }

    assert_eq!(tracker.fetch_count(), 1);
    for tile in &tiles {
        assert_eq!(tile.status(), DataStatus::Full);
        assert_eq!(tile, &tiles[0]);
    }
    assert_window(&tiles[0], 0, request);

    let stats = reader.cache_stats(0).await.unwrap();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spanning_requests() {
    let (reader, tracker) = open_source(slow_source(20), ReaderOptions::default()).await;
    let reader = Arc::new(reader);

    // Overlapping windows over the same four cells
    let requests = [
        rect(200, 200, 300, 300),
        rect(0, 0, 511, 511),
        rect(255, 255, 256, 256),
        rect(100, 300, 400, 310),
    ];

    let handles: Vec<_> = requests
        .iter()
        .cycle()
        .take(16)
        .map(|&request| {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { (request, reader.get_tile(request, 0).await) })
        })
        .collect();

    for handle in handles {
        let (request, tile) = handle.await.unwrap();
        assert_eq!(tile.status(), DataStatus::Full);
        assert_window(&tile, 0, request);
    }

    assert_eq!(tracker.fetch_count(), 4);
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(tracker.fetches_of(proxy(0, x, y)).await, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failure_is_shared() {
    let (reader, tracker) = open_source(slow_source(100), ReaderOptions::default()).await;
    let reader = Arc::new(reader);
    let request = rect(0, 0, 99, 99);
    tracker.fail(proxy(0, 0, 0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let reader = Arc::clone(&reader);
            tokio::spawn(async move { reader.try_get_tile(request, 0).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }
    assert_eq!(tracker.fetch_count(), 1);
    assert_eq!(reader.cache_stats(0).await.unwrap().entries, 0);

    tracker.heal(proxy(0, 0, 0));
    let tile = reader.get_tile(request, 0).await;
    assert_eq!(tile.status(), DataStatus::Full);
    assert_eq!(tracker.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_request_still_populates_cache() {
    let (reader, tracker) = open_source(slow_source(100), ReaderOptions::default()).await;
    let reader = Arc::new(reader);
    let request = rect(300, 300, 500, 500);

    let task = {
        let reader = Arc::clone(&reader);
        tokio::spawn(async move { reader.get_tile(request, 0).await })
    };

    // Abort while the fetch is sleeping inside the dataset
    tokio::time::sleep(Duration::from_millis(20)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(reader.cache_stats(0).await.unwrap().entries, 1);

    let tile = reader.get_tile(request, 0).await;
    assert_eq!(tile.status(), DataStatus::Full);
    assert_window(&tile, 0, request);
    assert_eq!(tracker.fetch_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiter_joins_abandoned_fetch() {
    let (reader, tracker) = open_source(slow_source(100), ReaderOptions::default()).await;
    let reader = Arc::new(reader);
    let request = rect(0, 0, 9, 9);

    let leader = {
        let reader = Arc::clone(&reader);
        tokio::spawn(async move { reader.get_tile(request, 0).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    leader.abort();

    // Arrives while the abandoned fetch is still running
    let tile = reader.get_tile(request, 0).await;
    assert_eq!(tile.status(), DataStatus::Full);
    assert_eq!(tracker.fetch_count(), 1);
}

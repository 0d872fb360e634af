//! Decoded tile cache keyed by tile origin.
//!
//! One [`TileCache`] covers one image rectangle at one resolution level and
//! stores fully decoded, tile-aligned [`CacheEntry`] buffers.
//!
//! # Singleflight
//!
//! [`TileCache::get_or_fetch`] guarantees a tile origin is decoded at most
//! once while it is present or in flight: the first caller to miss becomes
//! the leader and spawns the fetch; concurrent callers for the same origin
//! wait for the leader's published result. Requests for different origins
//! never wait on each other's fetches.
//!
//! The leader's fetch runs in its own task. A caller that stops waiting does
//! not cancel it, so the tile still lands in the cache for later requests.
//!
//! # Eviction
//!
//! Unbounded by default. A [`CachePolicy`] can bound the total decoded size
//! and the entry count; least-recently-used entries are evicted first.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::debug;

use crate::error::{InvariantViolation, TileError};
use crate::raster::{Point, Rect, TileBuffer, TileGrid};

/// Default entry bound used by the CLI configuration.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Policy
// =============================================================================

/// Capacity bounds for a [`TileCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum total decoded size in bytes
    pub max_bytes: Option<usize>,

    /// Maximum number of cached tiles
    pub max_entries: Option<NonZeroUsize>,
}

impl CachePolicy {
    /// No bounds: entries live until removed or cleared.
    pub const fn unbounded() -> Self {
        Self {
            max_bytes: None,
            max_entries: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_max_entries(mut self, max_entries: NonZeroUsize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_bytes.is_none() && self.max_entries.is_none()
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A decoded, tile-aligned buffer shared read-only between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    buffer: TileBuffer,
}

impl CacheEntry {
    pub fn new(buffer: TileBuffer) -> Self {
        Self { buffer }
    }

    pub fn rect(&self) -> Rect {
        self.buffer.rect()
    }

    /// Cache key: the tile's upper-left corner.
    pub fn origin(&self) -> Point {
        self.buffer.origin()
    }

    pub fn buffer(&self) -> &TileBuffer {
        &self.buffer
    }

    pub fn size_in_bytes(&self) -> usize {
        self.buffer.data().size_in_bytes()
    }
}

/// Counters for a [`TileCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub bytes: usize,
}

// =============================================================================
// In-flight fetches
// =============================================================================

type FetchResult = Result<Arc<CacheEntry>, TileError>;

/// Result slot shared by the leader and waiters of one fetch.
struct InFlight {
    notify: Notify,
    result: std::sync::Mutex<Option<FetchResult>>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: std::sync::Mutex::new(None),
        }
    }

    fn result(&self) -> Option<FetchResult> {
        self.result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn publish(&self, result: FetchResult) {
        *self
            .result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(result);
        self.notify.notify_waiters();
    }

    async fn wait(&self) -> FetchResult {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the slot so a publish in between is not lost
            notified.as_mut().enable();

            if let Some(result) = self.result() {
                return result;
            }
            notified.await;
        }
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

struct Entries {
    lru: LruCache<Point, Arc<CacheEntry>>,
    bytes: usize,
}

/// Cache of decoded tiles for one image rectangle and tile grid.
pub struct TileCache {
    image_rect: Rect,
    grid: TileGrid,
    policy: CachePolicy,
    entries: RwLock<Entries>,
    in_flight: Mutex<HashMap<Point, Arc<InFlight>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    /// Create an empty, unbounded cache.
    pub fn new(image_rect: Rect, grid: TileGrid) -> Self {
        Self::with_policy(image_rect, grid, CachePolicy::unbounded())
    }

    /// Create an empty cache with capacity bounds.
    pub fn with_policy(image_rect: Rect, grid: TileGrid, policy: CachePolicy) -> Self {
        let lru = match policy.max_entries {
            Some(max) => LruCache::new(max),
            None => LruCache::unbounded(),
        };
        Self {
            image_rect,
            grid,
            policy,
            entries: RwLock::new(Entries { lru, bytes: 0 }),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn image_rect(&self) -> Rect {
        self.image_rect
    }

    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Get an entry, marking it recently used.
    ///
    /// Hits only take the read lock, so lookups of different origins run
    /// concurrently. Promotion happens when the write lock is free and is
    /// skipped under contention.
    pub async fn lookup(&self, origin: Point) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.read().await.lru.peek(&origin).cloned()?;
        if let Ok(mut entries) = self.entries.try_write() {
            entries.lru.promote(&origin);
        }
        Some(entry)
    }

    /// Check for an entry without updating LRU order.
    pub async fn contains(&self, origin: Point) -> bool {
        let entries = self.entries.read().await;
        entries.lru.contains(&origin)
    }

    /// Store an entry under its origin, replacing any previous entry.
    ///
    /// The entry must cover exactly one grid cell touching the image
    /// rectangle.
    pub async fn insert(&self, entry: CacheEntry) -> Result<(), InvariantViolation> {
        self.insert_shared(Arc::new(entry)).await
    }

    async fn insert_shared(&self, entry: Arc<CacheEntry>) -> Result<(), InvariantViolation> {
        self.check_entry(&entry)?;

        let origin = entry.origin();
        let size = entry.size_in_bytes();
        let mut entries = self.entries.write().await;

        if let Some(old) = entries.lru.pop(&origin) {
            entries.bytes = entries.bytes.saturating_sub(old.size_in_bytes());
        }
        // With the key removed, push only returns an entry evicted by the count bound
        if let Some((evicted_origin, evicted)) = entries.lru.push(origin, entry) {
            debug!(origin = %evicted_origin, "evicting tile");
            entries.bytes = entries.bytes.saturating_sub(evicted.size_in_bytes());
        }
        entries.bytes += size;

        if let Some(max_bytes) = self.policy.max_bytes {
            while entries.bytes > max_bytes {
                match entries.lru.pop_lru() {
                    Some((origin, evicted)) => {
                        debug!(%origin, "evicting tile");
                        entries.bytes = entries.bytes.saturating_sub(evicted.size_in_bytes());
                    }
                    None => break,
                }
            }
        }

        Ok(())
    }

    fn check_entry(&self, entry: &CacheEntry) -> Result<(), InvariantViolation> {
        let rect = entry.rect();
        let aligned = self.grid.tile_rect(entry.origin()) == Some(rect) && rect.is_tile_aligned(self.grid);
        if !aligned || !rect.intersects(&self.image_rect) {
            return Err(InvariantViolation::MisalignedEntry {
                rect,
                image: self.image_rect,
            });
        }
        Ok(())
    }

    /// Remove an entry.
    pub async fn remove(&self, origin: Point) -> Option<Arc<CacheEntry>> {
        let mut entries = self.entries.write().await;
        let removed = entries.lru.pop(&origin)?;
        entries.bytes = entries.bytes.saturating_sub(removed.size_in_bytes());
        Some(removed)
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.lru.clear();
        entries.bytes = 0;
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.lru.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.lru.is_empty()
    }

    /// Total decoded size of cached tiles in bytes.
    pub async fn size(&self) -> usize {
        self.entries.read().await.bytes
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.lru.len(),
            bytes: entries.bytes,
        }
    }

    /// Return the entry at `origin`, running `fetch` to create it on a miss.
    ///
    /// `fetch` is only polled if this call becomes the leader for `origin`;
    /// otherwise it is dropped unpolled. A failed fetch is not cached, so a
    /// later call retries.
    pub async fn get_or_fetch<F>(self: &Arc<Self>, origin: Point, fetch: F) -> FetchResult
    where
        F: Future<Output = Result<CacheEntry, TileError>> + Send + 'static,
    {
        if let Some(entry) = self.lookup(origin).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry);
        }

        let (state, leader) = {
            let mut in_flight = self.in_flight.lock().await;

            // A finishing leader publishes to the cache before leaving the map
            if let Some(entry) = self.lookup(origin).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry);
            }

            match in_flight.get(&origin) {
                Some(state) => (state.clone(), false),
                None => {
                    let state = Arc::new(InFlight::new());
                    in_flight.insert(origin, state.clone());
                    (state, true)
                }
            }
        };

        if leader {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(%origin, "tile cache miss, fetching");

            let cache = Arc::clone(self);
            let task_state = Arc::clone(&state);
            tokio::spawn(async move {
                let result = match tokio::spawn(fetch).await {
                    Ok(result) => result.map(Arc::new),
                    Err(e) => Err(TileError::FetchAborted(e.to_string())),
                };
                cache.complete(origin, &task_state, result).await;
            });
        } else {
            debug!(%origin, "waiting for in-flight tile");
        }

        state.wait().await
    }

    /// Publish a leader's result: cache it, leave the in-flight map, wake waiters.
    async fn complete(&self, origin: Point, state: &InFlight, result: FetchResult) {
        let mut in_flight = self.in_flight.lock().await;

        let result = match result {
            Ok(entry) => self.insert_shared(entry.clone()).await.map(|_| entry).map_err(TileError::from),
            Err(e) => Err(e),
        };

        in_flight.remove(&origin);
        drop(in_flight);

        state.publish(result);
    }
}

// =============================================================================
// Tests
// =============================================================================

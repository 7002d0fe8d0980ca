//! QCP Cache - Delivery cache for resolved cell payloads
//!
//! Bounded LRU cache with sliding TTL:
//!
//! - A hit moves the entry to most-recently-used position and refreshes its
//!   TTL (sliding expiration on read)
//! - Insertion past capacity evicts the single least-recently-used entry
//! - Expired entries are purged lazily on access and counted separately
//!   from LRU evictions
//!
//! All operations are guarded by one internal mutex and are safe to call
//! from any number of in-flight delivery tasks.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use qcp_core::Cell;

/// Configuration for the delivery cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cells to cache.
    pub max_size: usize,

    /// Time-to-live for cached cells.
    pub ttl: Duration,
}

impl CacheConfig {
    /// Create a configuration with explicit capacity and TTL.
    #[must_use]
    pub const fn new(max_size: usize, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    /// Entries currently cached.
    pub size: usize,
    /// Lookup hits.
    pub hit_count: u64,
    /// Lookup misses (including expired entries).
    pub miss_count: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Entries evicted by LRU pressure.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
}

#[derive(Debug)]
struct CacheEntry {
    cell: Cell,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    // IndexMap keeps insertion order; re-inserting on access is the
    // move-to-most-recently-used operation.
    entries: IndexMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// LRU + sliding-TTL store of resolved cells.
pub struct DeliveryCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl DeliveryCache {
    /// Create a new cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        info!(
            capacity = config.max_size,
            ttl_secs = config.ttl.as_secs(),
            "delivery cache initialized"
        );
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Look up a cell, refreshing its recency and TTL on a hit.
    ///
    /// An entry whose TTL has elapsed is removed and counted as a miss.
    #[must_use]
    pub fn get(&self, cell_id: &str) -> Option<Cell> {
        let mut state = self.state.lock();
        let now = Instant::now();

        let Some(entry) = state.entries.shift_remove(cell_id) else {
            state.misses += 1;
            return None;
        };

        if now > entry.expires_at {
            state.expirations += 1;
            state.misses += 1;
            debug!(cell_id, "cached cell expired");
            return None;
        }

        let cell = entry.cell.clone();
        state.entries.insert(
            cell_id.to_string(),
            CacheEntry {
                cell: entry.cell,
                expires_at: now + self.config.ttl,
            },
        );
        state.hits += 1;
        Some(cell)
    }

    /// Insert or refresh a cell, evicting the least-recently-used entry if
    /// the cache is at capacity.
    pub fn add(&self, cell_id: &str, cell: Cell) {
        let mut state = self.state.lock();

        if state.entries.len() >= self.config.max_size && !state.entries.contains_key(cell_id) {
            if let Some((evicted_id, _)) = state.entries.shift_remove_index(0) {
                state.evictions += 1;
                debug!(cell_id = %evicted_id, "evicted least recently used cell");
            }
        }

        // Re-insert so updates also move to most-recently-used position.
        state.entries.shift_remove(cell_id);
        state.entries.insert(
            cell_id.to_string(),
            CacheEntry {
                cell,
                expires_at: Instant::now() + self.config.ttl,
            },
        );
    }

    /// Remove a cell; returns whether it was present.
    pub fn remove(&self, cell_id: &str) -> bool {
        self.state.lock().entries.shift_remove(cell_id).is_some()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Snapshot the cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let total = state.hits + state.misses;
        let hit_rate = if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                state.hits as f64 / total as f64 * 100.0
            }
        } else {
            0.0
        };
        CacheStats {
            size: state.entries.len(),
            hit_count: state.hits,
            miss_count: state.misses,
            hit_rate,
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }
}

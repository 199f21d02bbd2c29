//! Scan result cache
//!
//! LRU-bounded store with a TTL, keyed by a hash of the scan parameters.
//! The scanner itself never caches; `CachedScanner` composes the two.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::ScanError;
use crate::scanner::{LogTailScanner, ScanRequest, ScanResult};

pub trait ScanCache: Send + Sync {
    fn get(&self, key: &str) -> Option<ScanResult>;
    fn put(&self, key: String, result: ScanResult);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ScanResult,
    inserted_at: Instant,
}

/// LRU-based scan cache with TTL
pub struct TtlScanCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl TtlScanCache {
    /// * `capacity` - Maximum number of results kept (at least 1)
    /// * `ttl` - How long a result stays valid
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop expired results
    pub fn prune_expired(&self) {
        let mut cache = self.lock();
        let now = Instant::now();

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.inserted_at) >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            cache.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl ScanCache for TtlScanCache {
    fn get(&self, key: &str) -> Option<ScanResult> {
        let mut cache = self.lock();
        let expired = match cache.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    fn put(&self, key: String, result: ScanResult) {
        self.lock().put(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Hex SHA-256 of the resolved path and request bounds
pub fn scan_cache_key(path: &Path, request: &ScanRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(request.window_hours.to_le_bytes());
    hasher.update((request.max_lines as u64).to_le_bytes());
    hasher.update(request.max_file_size_bytes.to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Scanner fronted by a cache. Errors and partial results are never cached.
pub struct CachedScanner<C: ScanCache> {
    scanner: LogTailScanner,
    cache: C,
}

impl<C: ScanCache> CachedScanner<C> {
    pub fn new(scanner: LogTailScanner, cache: C) -> Self {
        Self { scanner, cache }
    }

    pub fn scanner(&self) -> &LogTailScanner {
        &self.scanner
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let path = self.scanner.resolve_path(request)?;
        let key = scan_cache_key(&path, request);

        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "scan cache hit");
            return Ok(hit);
        }

        let result = self.scanner.scan(request)?;
        if !result.is_partial() {
            self.cache.put(key, result.clone());
        }
        Ok(result)
    }
}

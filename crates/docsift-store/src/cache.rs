//! Result cache keyed by request fingerprint

use crate::StoreError;
use docsift_domain::{ExtractionResult, Schema, TableRow};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Deterministic fingerprint of one request's inputs
///
/// Lowercase hex SHA-256 over the label, the document text, the table rows
/// and the schema entries sorted by field name. Every part is
/// length-prefixed, so no two distinct inputs share a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request
    pub fn derive(label: &str, text: &str, tables: &[TableRow], schema: &Schema) -> Self {
        let mut hasher = Sha256::new();

        feed(&mut hasher, label.as_bytes());
        feed(&mut hasher, text.as_bytes());

        hasher.update((tables.len() as u64).to_le_bytes());
        for row in tables {
            hasher.update((row.len() as u64).to_le_bytes());
            for cell in row {
                feed(&mut hasher, cell.as_bytes());
            }
        }

        let entries = schema.fingerprint_entries();
        hasher.update((entries.len() as u64).to_le_bytes());
        for (name, description) in entries {
            feed(&mut hasher, name.as_bytes());
            feed(&mut hasher, description.as_bytes());
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn feed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Bounded map from [`CacheKey`] to a complete [`ExtractionResult`]
///
/// Entries are stored as serialized JSON. A replay therefore returns exactly
/// what was stored, and an entry that no longer decodes is dropped and
/// reported as a miss instead of failing the request.
pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, Vec<u8>>>,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results
    ///
    /// # Errors
    /// Returns error if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        let capacity =
            NonZeroUsize::new(capacity).ok_or(StoreError::InvalidCapacity("cache_capacity"))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<CacheKey, Vec<u8>>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Look up a result; a miss is not an error
    pub fn get(&self, key: &CacheKey) -> Option<ExtractionResult> {
        let mut entries = match self.lock() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache unavailable, treating as miss");
                return None;
            }
        };

        let bytes = entries.get(key)?;
        match serde_json::from_slice(bytes) {
            Ok(result) => {
                debug!(key = %key, "cache hit");
                Some(result)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "dropping corrupt cache entry");
                entries.pop(key);
                None
            }
        }
    }

    /// Store a result, evicting the least recently used entry when full
    ///
    /// # Errors
    /// Returns error if the result cannot be serialized or the lock is poisoned
    pub fn put(&self, key: CacheKey, result: &ExtractionResult) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(result)?;
        let mut entries = self.lock()?;
        if let Some((evicted, _)) = entries.push(key.clone(), bytes) {
            if evicted != key {
                debug!(key = %evicted, "cache entry evicted");
            }
        }
        Ok(())
    }

    /// Whether `key` is present (does not refresh recency)
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().map(|e| e.contains(key)).unwrap_or(false)
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached results
    pub fn capacity(&self) -> usize {
        self.lock().map(|e| e.cap().get()).unwrap_or(0)
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut entries) = self.lock() {
            entries.clear();
        }
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

//! Bounded reference-name to file-ID cache

use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// Maps reference names to the Drive file IDs last resolved for them.
///
/// The cache only saves list calls; a miss always falls back to a Drive
/// query, so implementations may evict whatever they like.
pub trait NameCache: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn insert(&self, name: &str, id: &str);
    fn remove(&self, name: &str);
}

/// In-memory LRU [`NameCache`]
pub struct LruNameCache {
    ids: Cache<String, String>,
}

impl LruNameCache {
    /// Entries are a name and an ID, so a thousand of them is cheap for any server.
    pub const DEFAULT_CAPACITY: u64 = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        let ids = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { ids }
    }

    /// Number of cached entries once pending evictions have been applied
    pub fn len(&self) -> u64 {
        self.ids.run_pending_tasks();
        self.ids.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LruNameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCache for LruNameCache {
    fn get(&self, name: &str) -> Option<String> {
        self.ids.get(name)
    }

    fn insert(&self, name: &str, id: &str) {
        self.ids.insert(name.to_string(), id.to_string());
    }

    fn remove(&self, name: &str) {
        self.ids.invalidate(name);
    }
}

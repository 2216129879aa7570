//! Bucket region cache.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Bucket name to region mapping shared by concurrent resolvers.
///
/// Entries never expire; a bucket's region does not change for its lifetime.
pub trait RegionCache: Send + Sync {
    fn get(&self, bucket: &str) -> Option<String>;

    /// Record `region` for `bucket`, replacing any earlier value.
    fn insert(&self, bucket: String, region: String);

    fn remove(&self, bucket: &str) -> Option<String>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local [`RegionCache`] behind a reader-writer lock.
#[derive(Debug, Default)]
pub struct InMemoryRegionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryRegionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionCache for InMemoryRegionCache {
    fn get(&self, bucket: &str) -> Option<String> {
        self.entries.read().get(bucket).cloned()
    }

    fn insert(&self, bucket: String, region: String) {
        self.entries.write().insert(bucket, region);
    }

    fn remove(&self, bucket: &str) -> Option<String> {
        self.entries.write().remove(bucket)
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

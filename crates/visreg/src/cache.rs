//! Bounded in-memory cache of decoded baselines.

use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of decoded baselines kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// LRU cache of decoded baselines keyed by sanitized name
#[derive(Debug)]
pub struct BaselineCache {
    /// Maximum number of entries
    capacity: usize,
    /// Cached images (key -> image)
    entries: HashMap<String, Arc<RgbaImage>>,
    /// Access order for LRU eviction, oldest first
    access_order: Vec<String>,
}

impl BaselineCache {
    /// Create a cache holding at most `capacity` baselines. A capacity of 0
    /// caches nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            access_order: Vec::new(),
        }
    }

    /// Cached image for `key`, marking it most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<RgbaImage>> {
        let image = self.entries.get(key).map(Arc::clone)?;
        self.touch(key);
        Some(image)
    }

    /// Insert `image` under `key`, evicting the least recently used entries
    /// beyond capacity.
    pub fn insert(&mut self, key: String, image: Arc<RgbaImage>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), image).is_some() {
            self.touch(&key);
            return;
        }
        self.access_order.push(key);

        while self.entries.len() > self.capacity {
            if self.access_order.is_empty() {
                break;
            }
            let oldest = self.access_order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    /// Drop the entry for `key`
    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.access_order.retain(|k| k != key);
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    /// Whether `key` is cached, without touching its access order
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached baselines
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached baselines
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            let key = self.access_order.remove(pos);
            self.access_order.push(key);
        }
    }
}

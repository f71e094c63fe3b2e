//! Process-wide model state.
//!
//! Everything that would otherwise be a static (the cache configuration and
//! the attached-documentation location caches) lives in a [`ModelContext`]
//! that callers construct and pass down explicitly.

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

use crate::config::CacheConfig;

#[derive(Debug, Default)]
pub struct UrlValidityCache {
    valid: Mutex<HashSet<String>>,
    invalid: Mutex<HashSet<String>>,
}

impl UrlValidityCache {
    pub fn is_known_valid(&self, location: &str) -> bool {
        self.valid.lock().contains(location)
    }

    pub fn is_known_invalid(&self, location: &str) -> bool {
        self.invalid.lock().contains(location)
    }

    pub fn mark_valid(&self, location: &str) {
        debug!(target: "jmodel.model", location, "documentation location valid");
        self.invalid.lock().remove(location);
        self.valid.lock().insert(location.to_string());
    }

    pub fn mark_invalid(&self, location: &str) {
        debug!(target: "jmodel.model", location, "documentation location invalid");
        self.valid.lock().remove(location);
        self.invalid.lock().insert(location.to_string());
    }

    pub fn clear(&self) {
        self.valid.lock().clear();
        self.invalid.lock().clear();
    }
}

#[derive(Debug, Default)]
pub struct ModelContext {
    config: CacheConfig,
    urls: UrlValidityCache,
}

impl ModelContext {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            urls: UrlValidityCache::default(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(CacheConfig::from_env())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn urls(&self) -> &UrlValidityCache {
        &self.urls
    }

    pub fn reset(&self) {
        self.urls.clear();
    }
}

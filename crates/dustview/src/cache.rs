//! Raw source caches.
//!
//! A [`SourceCache`] maps a cache key to the raw template text that was last
//! fetched for it. The template loader consults the cache before asking the
//! source loader, and repopulates it on every miss.
//!
//! Two policies are provided:
//!
//! - [`InMemorySourceCache`] keeps the text itself, so a cache hit can be
//!   re-registered with the engine without touching the source loader.
//! - [`PresenceSourceCache`] only remembers that a key was loaded. Its
//!   [`get`](SourceCache::get) yields empty text; the loader treats a hit as
//!   "already registered" and leaves the engine alone.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// Thread-safe store of raw template sources.
pub trait SourceCache: Send + Sync {
    fn is_cached(&self, key: &str) -> bool;

    /// Returns the cached text. Only meaningful after [`is_cached`](Self::is_cached)
    /// returned `true`; `None` means the entry vanished in between.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `source` under `key`, replacing any previous entry.
    fn add(&self, key: &str, source: &str);

    /// Removes the entry, returning whether one existed.
    fn remove(&self, key: &str) -> bool;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`get`](Self::get) returns the real source text.
    fn retains_source(&self) -> bool {
        true
    }
}

/// Keeps full source text in memory.
#[derive(Debug, Default)]
pub struct InMemorySourceCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySourceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceCache for InMemorySourceCache {
    fn is_cached(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn add(&self, key: &str, source: &str) {
        self.entries.write().insert(key.to_string(), source.to_string());
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Records which keys were loaded without keeping their text.
#[derive(Debug, Default)]
pub struct PresenceSourceCache {
    keys: RwLock<HashSet<String>>,
}

impl PresenceSourceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceCache for PresenceSourceCache {
    fn is_cached(&self, key: &str) -> bool {
        self.keys.read().contains(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.is_cached(key).then(String::new)
    }

    fn add(&self, key: &str, _source: &str) {
        self.keys.write().insert(key.to_string());
    }

    fn remove(&self, key: &str) -> bool {
        self.keys.write().remove(key)
    }

    fn clear(&self) {
        self.keys.write().clear();
    }

    fn len(&self) -> usize {
        self.keys.read().len()
    }

    fn retains_source(&self) -> bool {
        false
    }
}

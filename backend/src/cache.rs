use std::{
    num::NonZeroUsize,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use lru::LruCache;
use shared::Poi;
use tokio::time::Instant;

/// Places responses keyed by query, expiring `ttl` after insertion. The
/// least recently used entry is evicted when full.
pub struct PlacesCache {
    entries: Mutex<LruCache<String, (Instant, Vec<Poi>)>>,
    ttl: Duration,
}

impl PlacesCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// `"{lat}_{lng}_{radius_m}_{types}"`, with `types` exactly as received.
    pub fn key(lat: f64, lng: f64, radius_m: u32, types: &str) -> String {
        format!("{lat}_{lng}_{radius_m}_{types}")
    }

    pub fn get(&self, key: &str) -> Option<Vec<Poi>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries
            .get(key)
            .map(|(inserted, places)| (inserted.elapsed() < self.ttl).then(|| places.clone()));
        match fresh {
            Some(Some(places)) => Some(places),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, places: Vec<Poi>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(key, (Instant::now(), places));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

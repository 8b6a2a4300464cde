// phpbb-acl
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Expiring caches for storage lookups shared across sessions

use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    /// Cached value
    value: T,
    /// When this entry expires
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,

    /// Total cache misses
    pub misses: u64,

    /// Entries dropped because they expired or were invalidated
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 { 0.0 } else { self.hits as f64 / (self.hits + self.misses) as f64 }
    }
}

#[derive(Debug)]
struct Slot<T> {
    entry: Option<CacheEntry<T>>,
    stats: CacheStats,
}

/// Single value cache with a time to live
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: RwLock<Slot<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: RwLock::new(Slot { entry: None, stats: CacheStats::default() }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value, `None` when empty or expired
    pub fn get(&self) -> Option<T> {
        let mut slot = self.slot.write();
        let expired = slot.entry.as_ref().map(CacheEntry::is_expired);

        match expired {
            Some(false) => {
                slot.stats.hits += 1;
                debug!("{} cache hit", self.name);
                slot.entry.as_ref().map(|entry| entry.value.clone())
            }
            Some(true) => {
                slot.entry = None;
                slot.stats.evictions += 1;
                slot.stats.misses += 1;
                debug!("{} cache entry expired", self.name);
                None
            }
            None => {
                slot.stats.misses += 1;
                debug!("{} cache miss", self.name);
                None
            }
        }
    }

    pub fn set(&self, value: T) {
        self.slot.write().entry = Some(CacheEntry::new(value, self.ttl));
        debug!("{} cached with TTL: {:?}", self.name, self.ttl);
    }

    /// Cached value, or the result of `load` which is then cached
    pub fn get_or_try_insert_with<E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let value = load()?;
        self.set(value.clone());
        Ok(value)
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        if slot.entry.take().is_some() {
            slot.stats.evictions += 1;
            debug!("{} cache invalidated", self.name);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.slot.read().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        assert_eq!(cache.ttl(), Duration::from_secs(60));
        assert!(cache.get().is_none());

        cache.set(vec![1, 2, 3]);
        assert_eq!(cache.get(), Some(vec![1, 2, 3]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new("test", Duration::ZERO);
        cache.set(42);
        assert!(cache.get().is_none());

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_get_or_try_insert_with_loads_once() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        let mut loads = 0;

        for _ in 0..3 {
            let value: Result<_, ()> = cache.get_or_try_insert_with(|| {
                loads += 1;
                Ok("catalog")
            });
            assert_eq!(value, Ok("catalog"));
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new("test", Duration::from_secs(60));
        assert_eq!(cache.get_or_try_insert_with(|| Err("down")), Err("down"));
        assert_eq!(cache.get_or_try_insert_with(|| Ok::<_, &str>(7)), Ok(7));
    }

    #[test]
    fn test_invalidate() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.set("x");
        cache.invalidate();
        assert!(cache.get().is_none());
        assert_eq!(cache.stats().evictions, 1);

        // invalidating an empty cache is a no-op
        cache.invalidate();
        assert_eq!(cache.stats().evictions, 1);
    }
}

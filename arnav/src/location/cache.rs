//! Reverse-geocode cache.
//!
//! Append-only map from quantized coordinate to place description. Entries
//! are never evicted; the cache lives as long as the manager. Backed by
//! `DashMap` so concurrent request tasks can read and write without a
//! global lock.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::types::PlaceDescription;
use crate::geo::{CoordinateKey, GeoCoordinate, DEFAULT_KEY_PRECISION};

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Coordinate-keyed place cache.
#[derive(Debug)]
pub struct LocationCache {
    entries: DashMap<CoordinateKey, PlaceDescription>,
    precision: u8,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PRECISION)
    }
}

impl LocationCache {
    /// Cache quantizing coordinates to `precision` decimal places.
    pub fn new(precision: u8) -> Self {
        Self {
            entries: DashMap::new(),
            precision,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(&self, coordinate: &GeoCoordinate) -> CoordinateKey {
        coordinate.cache_key(self.precision)
    }

    /// Look up a coordinate, counting the hit or miss.
    pub fn get(&self, coordinate: &GeoCoordinate) -> Option<PlaceDescription> {
        match self.entries.get(&self.key(coordinate)) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a place. A later insert for the same key wins.
    pub fn insert(&self, coordinate: &GeoCoordinate, place: PlaceDescription) {
        self.entries.insert(self.key(coordinate), place);
    }

    pub fn contains(&self, coordinate: &GeoCoordinate) -> bool {
        self.entries.contains_key(&self.key(coordinate))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str) -> PlaceDescription {
        PlaceDescription {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_nearby_coordinates_share_entry() {
        let cache = LocationCache::new(5);
        cache.insert(&GeoCoordinate::new(37.774_900_1, -122.419_400_2), place("A"));

        let hit = cache.get(&GeoCoordinate::new(37.774_900_3, -122.419_399_9));
        assert_eq!(hit, Some(place("A")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_coordinates_miss() {
        let cache = LocationCache::new(5);
        cache.insert(&GeoCoordinate::new(37.7749, -122.4194), place("A"));

        assert!(cache.get(&GeoCoordinate::new(37.7750, -122.4194)).is_none());
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_clear() {
        let cache = LocationCache::default();
        cache.insert(&GeoCoordinate::new(1.0, 2.0), place("A"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(&GeoCoordinate::new(1.0, 2.0)));
    }
}

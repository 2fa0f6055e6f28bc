//! Memoization of synthesized legs.
//!
//! Many tour candidates share legs, and the move synthesizer is a pure
//! function of (start, target, next target) for a fixed obstacle field, so a
//! leg computed once can be handed out again as is.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::geometry::Point;
use crate::models::Leg;

/// Identifies a leg by exact coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegKey {
    pub start: Point,
    pub target: Point,
    /// Where the tour goes after `target`, `None` on the return leg.
    pub next_target: Option<Point>,
}

impl LegKey {
    pub fn new(start: Point, target: Point, next_target: Option<Point>) -> Self {
        Self {
            start,
            target,
            next_target,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent leg cache scoped to one planning run.
#[derive(Debug, Default)]
pub struct RouteCache {
    legs: DashMap<LegKey, Arc<Leg>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LegKey) -> Option<Arc<Leg>> {
        match self.legs.get(key) {
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

    pub fn put(&self, key: LegKey, leg: Leg) -> Arc<Leg> {
        let leg = Arc::new(leg);
        self.legs.insert(key, leg.clone());
        leg
    }

    /// Return the cached leg for `key`, or compute and store it.
    ///
    /// The entry stays locked while `compute` runs, so callers racing on the
    /// same key wait for the first result instead of repeating the search.
    /// Errors are returned without being cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: LegKey, compute: F) -> Result<Arc<Leg>, E>
    where
        F: FnOnce() -> Result<Leg, E>,
    {
        match self.legs.entry(key) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Leg cache hit for {} -> {}", key.start, key.target);
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let leg = Arc::new(compute()?);
                entry.insert(leg.clone());
                Ok(leg)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Forget every leg and reset the counters. Call between planning runs
    /// over different obstacle fields.
    pub fn clear(&self) {
        self.legs.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

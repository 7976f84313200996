//! Client-side cache of last-known property and like state.
//!
//! One cache per signed-in user. Entries carry the instant they were
//! fetched from the authority; entries restored from a persisted
//! snapshot carry none and are treated as stale until revalidated.

use std::{
    collections::{BTreeSet, HashMap},
    time::{Duration, Instant},
};

use haven_core::{
    property::{Property, PropertyId, UserId},
    snapshot::LocalSnapshot,
};

/// Tunables for cache freshness and write patience.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are served stale and revalidated.
    pub refresh_interval: Duration,
    /// Writes that take longer than this are reported as network
    /// failures and any optimistic state is rolled back. No automatic
    /// retry.
    pub write_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { refresh_interval: Duration::from_secs(30), write_timeout: Duration::from_secs(10) }
    }
}

/// Result of a cached read.
///
/// `stale` means the value is missing or older than one refresh
/// interval; a background revalidation is already in flight when the
/// read came from [`crate::SyncClient::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRead {
    /// Last-known record, if any.
    pub property: Option<Property>,
    /// Whether the value is missing or past the refresh interval.
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    property: Property,
    /// None for entries restored from a snapshot: always stale.
    fetched_at: Option<Instant>,
}

/// Last-known snapshots for one user, keyed by property id.
#[derive(Debug)]
pub struct PropertyCache {
    user: UserId,
    entries: HashMap<PropertyId, CacheEntry>,
    liked: BTreeSet<PropertyId>,
}

impl PropertyCache {
    /// Create an empty cache for `user`.
    #[must_use]
    pub fn new(user: UserId) -> Self {
        Self { user, entries: HashMap::new(), liked: BTreeSet::new() }
    }

    /// Record a canonical property returned by the authority.
    ///
    /// The local liked set follows the canonical `liked_by`.
    pub fn insert(&mut self, property: Property, fetched_at: Option<Instant>) {
        if property.is_liked_by(&self.user) {
            self.liked.insert(property.id.clone());
        } else {
            self.liked.remove(&property.id);
        }
        self.entries.insert(property.id.clone(), CacheEntry { property, fetched_at });
    }

    /// Last-known record for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &PropertyId) -> Option<&Property> {
        self.entries.get(id).map(|entry| &entry.property)
    }

    /// Whether the entry for `id` is missing or has aged past
    /// `refresh_interval`.
    #[must_use]
    pub fn is_stale(&self, id: &PropertyId, now: Instant, refresh_interval: Duration) -> bool {
        match self.entries.get(id).and_then(|entry| entry.fetched_at) {
            Some(fetched_at) => now.duration_since(fetched_at) >= refresh_interval,
            None => true,
        }
    }

    /// Whether the user currently likes `id`, by the local view.
    #[must_use]
    pub fn is_liked(&self, id: &PropertyId) -> bool {
        self.liked.contains(id)
    }

    /// Optimistically flip the like for `id`; returns the new local
    /// state. Flip is its own inverse, so rollback is a second call.
    pub fn flip_like(&mut self, id: &PropertyId) -> bool {
        let now_liked = !self.liked.remove(id);
        if now_liked {
            self.liked.insert(id.clone());
        }
        if let Some(entry) = self.entries.get_mut(id) {
            if now_liked {
                entry.property.liked_by.insert(self.user.clone());
            } else {
                entry.property.liked_by.remove(&self.user);
            }
        }
        now_liked
    }

    /// Export the cache as a persistable snapshot.
    #[must_use]
    pub fn to_snapshot(&self, saved_at: u64) -> LocalSnapshot {
        LocalSnapshot {
            properties: self
                .entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.property.clone()))
                .collect(),
            liked: self.liked.clone(),
            saved_at,
        }
    }

    /// Replace the cache contents from a persisted snapshot.
    ///
    /// Restored entries have no fetch instant and read as stale until
    /// revalidated against the authority.
    pub fn restore(&mut self, snapshot: LocalSnapshot) {
        self.entries = snapshot
            .properties
            .into_iter()
            .map(|(id, property)| (id, CacheEntry { property, fetched_at: None }))
            .collect();
        self.liked = snapshot.liked;
    }
}

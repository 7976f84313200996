//! Canonical property records and the only write path.
//!
//! The store holds every canonical record behind its own async mutex
//! inside a shared map. [`PropertyStore::apply_transition`] is the
//! single way anything mutates a record: it runs a pure transition
//! under the property's exclusive section, verifies invariants, and
//! commits the result. Reads clone; callers never observe a record
//! mid-transition.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use haven_core::{
    env::Environment,
    error::TransitionError,
    property::{ListingFilter, NewListing, Property, PropertyId},
    session::Session,
};
use tokio::sync::{Mutex, RwLock};

/// Authoritative map of canonical property records.
///
/// The outer lock only guards map membership; each record's mutex
/// serializes transitions on that property alone, so transitions on
/// distinct properties run fully in parallel.
pub struct PropertyStore<E: Environment> {
    env: E,
    properties: RwLock<HashMap<PropertyId, Arc<Mutex<Property>>>>,
    next_id: AtomicU64,
}

impl<E: Environment> PropertyStore<E> {
    /// Create an empty store.
    pub fn new(env: E) -> Self {
        Self { env, properties: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }

    /// Ingest a listing from the listing collaborator.
    ///
    /// The record enters in state Available, owned by the session user,
    /// stamped with the environment's clock.
    pub async fn ingest(&self, listing: NewListing, owner: &Session) -> Property {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = PropertyId::new(format!("prop-{n}"));
        let now = self.env.unix_millis();
        let property = Property::from_listing(id.clone(), owner.user_id.clone(), listing, now);

        tracing::info!(property = %id, owner = %owner.user_id, "listing ingested");

        let mut map = self.properties.write().await;
        map.insert(id, Arc::new(Mutex::new(property.clone())));
        property
    }

    /// Whether a property with this id exists.
    pub async fn has_property(&self, id: &PropertyId) -> bool {
        self.properties.read().await.contains_key(id)
    }

    /// Fetch a clone of the canonical record.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get(&self, id: &PropertyId) -> Result<Property, TransitionError> {
        let slot = self.slot(id).await?;
        let record = slot.lock().await;
        Ok(record.clone())
    }

    /// Snapshot of every Available property matching `filter`.
    ///
    /// Restartable: each call observes a fresh snapshot; no cursor
    /// state is held between calls.
    pub async fn list_available(&self, filter: &ListingFilter) -> Vec<Property> {
        let mut out = Vec::new();
        for slot in self.slots().await {
            let record = slot.lock().await;
            if record.is_available() && filter.matches(&record) {
                out.push(record.clone());
            }
        }
        out
    }

    /// Snapshot of every property, regardless of state.
    pub async fn list_all(&self) -> Vec<Property> {
        let mut out = Vec::new();
        for slot in self.slots().await {
            let record = slot.lock().await;
            out.push(record.clone());
        }
        out
    }

    /// Run a pure transition under the property's exclusive section.
    ///
    /// `f` maps the current record to the next record plus an arbitrary
    /// payload (coordinator actions, a like flag). The commit happens
    /// only if the next record passes its invariant check; a violation
    /// aborts this transition and leaves the canonical record
    /// untouched. A transition that returns the record unchanged
    /// commits nothing, so idempotent retries have no side effects.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; whatever conflict `f` reports;
    /// `Invariant` if `f` produced an illegal record.
    pub async fn apply_transition<T, F>(
        &self,
        id: &PropertyId,
        f: F,
    ) -> Result<(Property, T), TransitionError>
    where
        F: FnOnce(&Property) -> Result<(Property, T), TransitionError>,
    {
        let slot = self.slot(id).await?;
        let mut record = slot.lock().await;

        let (mut next, payload) = f(&record)?;
        debug_assert_eq!(next.id, record.id, "transitions must not change the id");
        next.check_invariants()?;

        if next != *record {
            next.updated_at = self.env.unix_millis();
            *record = next.clone();
        }

        Ok((next, payload))
    }

    async fn slot(&self, id: &PropertyId) -> Result<Arc<Mutex<Property>>, TransitionError> {
        self.properties
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TransitionError::NotFound(id.clone()))
    }

    async fn slots(&self) -> Vec<Arc<Mutex<Property>>> {
        self.properties.read().await.values().cloned().collect()
    }
}

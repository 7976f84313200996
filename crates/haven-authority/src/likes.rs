//! Per-user liked sets.
//!
//! Likes live on the canonical property record (`liked_by`), so toggles
//! go through the same per-property write path as rental transitions.
//! Semantics are deliberately flip-count, not "set like": the engine
//! does not deduplicate concurrent toggles from one user, so two rapid
//! toggles both succeed and net out to no change.

use std::sync::Arc;

use haven_core::{
    authority::LikeOutcome,
    env::Environment,
    error::TransitionError,
    property::{Property, PropertyId, UserId},
};

use crate::{store::PropertyStore, transition};

/// Tracks which users like which properties.
pub struct LikeTracker<E: Environment> {
    store: Arc<PropertyStore<E>>,
}

impl<E: Environment> Clone for LikeTracker<E> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<E: Environment> LikeTracker<E> {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<PropertyStore<E>>) -> Self {
        Self { store }
    }

    /// Flip `user`'s like on the property; returns the resulting state
    /// (true = now liked) with the canonical record.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn toggle_like(
        &self,
        user: &UserId,
        property_id: &PropertyId,
    ) -> Result<LikeOutcome, TransitionError> {
        let (property, liked) = self
            .store
            .apply_transition(property_id, |current| transition::toggle_like(current, user))
            .await?;

        tracing::debug!(property = %property_id, %user, liked, "like toggled");
        Ok(LikeOutcome { liked, property })
    }

    /// Snapshot of the properties `user` currently likes. Restartable;
    /// each call observes a fresh snapshot.
    pub async fn list_liked(&self, user: &UserId) -> Vec<Property> {
        self.store.list_all().await.into_iter().filter(|p| p.is_liked_by(user)).collect()
    }
}

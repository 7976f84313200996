//! Rental request operations.
//!
//! Thin orchestration over the store: every operation routes a pure
//! transition through [`PropertyStore::apply_transition`], so two
//! operations on the same property can never interleave. The
//! coordinator is order-independent: when two accepts race, whichever
//! commits first wins and the loser observes `NotPending`.

use std::sync::Arc;

use haven_core::{
    env::Environment,
    error::TransitionError,
    property::{Property, PropertyId, RequestToken, UserId},
};

use crate::{
    store::PropertyStore,
    transition::{self, CoordinatorAction},
};

/// A committed transition: the canonical record after the commit plus
/// the declarative actions the transition implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Canonical record after the transition.
    pub property: Property,
    /// Side effects for the embedding runtime to execute.
    pub actions: Vec<CoordinatorAction>,
}

/// Coordinates rental requests against the property store.
pub struct RequestCoordinator<E: Environment> {
    store: Arc<PropertyStore<E>>,
}

impl<E: Environment> Clone for RequestCoordinator<E> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<E: Environment> RequestCoordinator<E> {
    /// Create a coordinator over the given store.
    pub fn new(store: Arc<PropertyStore<E>>) -> Self {
        Self { store }
    }

    /// Submit a rental request from `renter`.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyRented`, or `DuplicateRequest`.
    pub async fn request_rental(
        &self,
        property_id: &PropertyId,
        renter: &UserId,
        token: RequestToken,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (property, actions) = self
            .store
            .apply_transition(property_id, |current| {
                transition::request_rental(current, renter, token)
            })
            .await?;

        tracing::debug!(property = %property_id, %renter, "rental request recorded");
        Ok(TransitionOutcome { property, actions })
    }

    /// Accept `renter`'s pending request, implicitly rejecting all
    /// competing requests on the property.
    ///
    /// # Errors
    /// `NotFound` or `NotPending`.
    pub async fn accept_request(
        &self,
        property_id: &PropertyId,
        renter: &UserId,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (property, actions) = self
            .store
            .apply_transition(property_id, |current| transition::accept_request(current, renter))
            .await?;

        tracing::info!(property = %property_id, tenant = %renter, "request accepted");
        Ok(TransitionOutcome { property, actions })
    }

    /// Reject `renter`'s pending request only.
    ///
    /// # Errors
    /// `NotFound` or `NotPending`.
    pub async fn reject_request(
        &self,
        property_id: &PropertyId,
        renter: &UserId,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (property, actions) = self
            .store
            .apply_transition(property_id, |current| transition::reject_request(current, renter))
            .await?;

        tracing::debug!(property = %property_id, %renter, "request rejected");
        Ok(TransitionOutcome { property, actions })
    }

    /// Administrative reset: Rented back to Available.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn release(
        &self,
        property_id: &PropertyId,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (property, actions) =
            self.store.apply_transition(property_id, transition::release).await?;

        tracing::info!(property = %property_id, "property released");
        Ok(TransitionOutcome { property, actions })
    }

    /// Properties owned by `owner` that have at least one pending
    /// request, paired with the requesting renters.
    pub async fn list_pending_for_owner(
        &self,
        owner: &UserId,
    ) -> Vec<(Property, Vec<UserId>)> {
        self.store
            .list_all()
            .await
            .into_iter()
            .filter(|p| &p.owner_id == owner && !p.pending.is_empty())
            .map(|p| {
                let requesters = p.pending_requesters();
                (p, requesters)
            })
            .collect()
    }

    /// Properties `tenant` currently rents. Restartable; each call
    /// observes a fresh snapshot.
    pub async fn list_rented_for_tenant(&self, tenant: &UserId) -> Vec<Property> {
        self.store
            .list_all()
            .await
            .into_iter()
            .filter(|p| p.active_tenant_id.as_ref() == Some(tenant))
            .collect()
    }
}

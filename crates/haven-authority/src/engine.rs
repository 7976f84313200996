//! Engine facade: the in-process [`Authority`] implementation.
//!
//! Composes the store, coordinator, and like tracker behind the
//! [`Authority`] seam clients talk through. Coordinator actions stop at
//! this boundary; notification delivery belongs to whatever runtime
//! embeds the engine, and clients only ever receive the canonical
//! record.

use std::sync::Arc;

use async_trait::async_trait;
use haven_core::{
    authority::{Authority, AuthorityError, LikeOutcome},
    env::Environment,
    property::{ListingFilter, NewListing, Property, PropertyId, RequestToken, UserId},
    session::Session,
};

use crate::{coordinator::RequestCoordinator, likes::LikeTracker, store::PropertyStore};

/// The complete authority: store, coordinator, and like tracker over
/// one set of canonical records.
pub struct RentalEngine<E: Environment> {
    store: Arc<PropertyStore<E>>,
    coordinator: RequestCoordinator<E>,
    likes: LikeTracker<E>,
}

impl<E: Environment> Clone for RentalEngine<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: self.coordinator.clone(),
            likes: self.likes.clone(),
        }
    }
}

impl<E: Environment> RentalEngine<E> {
    /// Create an empty engine.
    pub fn new(env: E) -> Self {
        let store = Arc::new(PropertyStore::new(env));
        let coordinator = RequestCoordinator::new(Arc::clone(&store));
        let likes = LikeTracker::new(Arc::clone(&store));
        Self { store, coordinator, likes }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<PropertyStore<E>> {
        &self.store
    }

    /// The request coordinator, for embedders that consume actions.
    #[must_use]
    pub fn coordinator(&self) -> &RequestCoordinator<E> {
        &self.coordinator
    }

    /// The like tracker.
    #[must_use]
    pub fn likes(&self) -> &LikeTracker<E> {
        &self.likes
    }

    /// Ingest a listing from the listing collaborator.
    pub async fn ingest(&self, listing: NewListing, owner: &Session) -> Property {
        self.store.ingest(listing, owner).await
    }
}

#[async_trait]
impl<E: Environment> Authority for RentalEngine<E> {
    async fn fetch(&self, id: &PropertyId) -> Result<Property, AuthorityError> {
        Ok(self.store.get(id).await?)
    }

    async fn list_available(
        &self,
        filter: &ListingFilter,
    ) -> Result<Vec<Property>, AuthorityError> {
        Ok(self.store.list_available(filter).await)
    }

    async fn request_rental(
        &self,
        id: &PropertyId,
        renter: &UserId,
        token: RequestToken,
    ) -> Result<Property, AuthorityError> {
        Ok(self.coordinator.request_rental(id, renter, token).await?.property)
    }

    async fn accept_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError> {
        Ok(self.coordinator.accept_request(id, renter).await?.property)
    }

    async fn reject_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError> {
        Ok(self.coordinator.reject_request(id, renter).await?.property)
    }

    async fn release(&self, id: &PropertyId) -> Result<Property, AuthorityError> {
        Ok(self.coordinator.release(id).await?.property)
    }

    async fn toggle_like(
        &self,
        user: &UserId,
        id: &PropertyId,
    ) -> Result<LikeOutcome, AuthorityError> {
        Ok(self.likes.toggle_like(user, id).await?)
    }

    async fn list_liked(&self, user: &UserId) -> Result<Vec<Property>, AuthorityError> {
        Ok(self.likes.list_liked(user).await)
    }

    async fn list_rented_for_tenant(
        &self,
        tenant: &UserId,
    ) -> Result<Vec<Property>, AuthorityError> {
        Ok(self.coordinator.list_rented_for_tenant(tenant).await)
    }

    async fn list_pending_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<(Property, Vec<UserId>)>, AuthorityError> {
        Ok(self.coordinator.list_pending_for_owner(owner).await)
    }
}

//! Authority seam: the boundary clients talk through.
//!
//! Abstracts over the single source of truth for property state.
//! Production uses the in-process rental engine; tests wrap it with a
//! fault-injecting simulation. Transport and auth details live behind
//! this trait and are out of the engine's scope.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    error::TransitionError,
    property::{ListingFilter, Property, PropertyId, RequestToken, UserId},
};

/// Error returned across the authority boundary.
///
/// Conflicts are the authority speaking; the network variants are the
/// boundary itself failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The authority processed the operation and refused it.
    #[error(transparent)]
    Conflict(#[from] TransitionError),

    /// The operation may or may not have reached the authority.
    #[error("network failure")]
    NetworkFailure,

    /// The authority is unreachable; do not retry blindly.
    #[error("authority unavailable")]
    Unavailable,
}

impl From<AuthorityError> for crate::error::SyncError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::Conflict(e) => Self::Conflict(e),
            AuthorityError::NetworkFailure => Self::NetworkFailure,
            AuthorityError::Unavailable => Self::AuthorityUnavailable,
        }
    }
}

/// Result of a like toggle at the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOutcome {
    /// Whether the property is liked after the toggle.
    pub liked: bool,
    /// The canonical record after the toggle.
    pub property: Property,
}

/// The single source of truth for property and request state.
///
/// Every mutation returns the canonical record after the transition so
/// callers can reconcile caches against authority state instead of
/// trusting optimistic guesses.
#[async_trait]
pub trait Authority: Send + Sync + 'static {
    /// Fetch the canonical record for one property.
    async fn fetch(&self, id: &PropertyId) -> Result<Property, AuthorityError>;

    /// List Available properties matching `filter`. Restartable; each
    /// call observes a fresh snapshot.
    async fn list_available(&self, filter: &ListingFilter)
    -> Result<Vec<Property>, AuthorityError>;

    /// Submit a rental request. `token` makes retries idempotent.
    async fn request_rental(
        &self,
        id: &PropertyId,
        renter: &UserId,
        token: RequestToken,
    ) -> Result<Property, AuthorityError>;

    /// Accept `renter`'s pending request, renting the property to them
    /// and implicitly rejecting all competing requests.
    async fn accept_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError>;

    /// Reject `renter`'s pending request, leaving other requests alone.
    async fn reject_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError>;

    /// Administrative reset: Rented back to Available.
    async fn release(&self, id: &PropertyId) -> Result<Property, AuthorityError>;

    /// Flip `user`'s like on the property.
    async fn toggle_like(
        &self,
        user: &UserId,
        id: &PropertyId,
    ) -> Result<LikeOutcome, AuthorityError>;

    /// Properties `user` currently likes.
    async fn list_liked(&self, user: &UserId) -> Result<Vec<Property>, AuthorityError>;

    /// Properties `tenant` currently rents.
    async fn list_rented_for_tenant(
        &self,
        tenant: &UserId,
    ) -> Result<Vec<Property>, AuthorityError>;

    /// Properties owned by `owner` with at least one pending request,
    /// paired with the requesting renters.
    async fn list_pending_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<(Property, Vec<UserId>)>, AuthorityError>;
}

//! Canonical property record and its invariants.
//!
//! A `Property` is the single shared mutable resource in the system. The
//! authority owns the canonical copy; clients hold non-authoritative
//! cached clones keyed by [`PropertyId`]. Every mutation flows through
//! the authority's per-property exclusive section, so the pure methods
//! here never need interior locking.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────┐  accept_request   ┌────────┐
//! │ Available │──────────────────>│ Rented │
//! └───────────┘                   └────────┘
//!       ↑        release                │
//!       └───────────────────────────────┘
//! ```
//!
//! The pending-requester map is auxiliary data attached to Available:
//! requests accumulate while Available, and accepting one clears them
//! all (competing requests are implicitly rejected).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque stable identifier for a property.
///
/// String-backed; the authority treats it as an opaque key and never
/// inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(String);

impl PropertyId {
    /// Create a property id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque stable identifier for a user (renter or owner).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied idempotency token for a rental request.
///
/// Retrying a failed `request_rental` with the same token is a no-op if
/// the original attempt already committed; a *different* token from a
/// renter who is already pending is a duplicate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Wrap a raw token value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw token value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Reference to a blob-hosted image.
///
/// The engine stores only references; resolving them to URLs is the
/// blob-storage collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a raw image reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The raw reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyState {
    /// Listed and open for rental requests.
    Available,
    /// Occupied by an active tenant; requests are refused.
    Rented,
}

/// Invariant violation detected on a property record.
///
/// These indicate a transition bug, never an expected race. The store
/// aborts the offending transition and leaves the record unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An active tenant is set but the state is not Rented.
    #[error("active tenant set while state is Available")]
    TenantWhileAvailable,

    /// State is Rented but no active tenant is set.
    #[error("state is Rented with no active tenant")]
    RentedWithoutTenant,

    /// The active tenant still appears in the pending-requester set.
    #[error("active tenant {0} still pending")]
    TenantStillPending(UserId),

    /// Price must be a positive amount in minor currency units.
    #[error("price must be positive")]
    NonPositivePrice,
}

/// Payload from the listing collaborator for a newly created property.
///
/// Ingested by the authority in state Available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    /// Listing title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Positive price in minor currency units.
    pub price: u64,
    /// Human-readable location.
    pub location: String,
    /// Thumbnail image reference, if any.
    pub thumbnail: Option<ImageRef>,
    /// Gallery image references.
    pub pictures: Vec<ImageRef>,
}

/// Canonical property record.
///
/// The authority exclusively owns the canonical copy. Clients hold
/// cached clones that are valid until invalidated by a successful write
/// or a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Stable id.
    pub id: PropertyId,
    /// Owner of the listing.
    pub owner_id: UserId,
    /// Listing title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Positive price in minor currency units.
    pub price: u64,
    /// Human-readable location.
    pub location: String,
    /// Lifecycle state.
    pub state: PropertyState,
    /// The active tenant. Set iff `state == Rented`.
    pub active_tenant_id: Option<UserId>,
    /// Outstanding rental requests: renter id to the idempotency token
    /// that created the request. Keys are the pending-requester set.
    pub pending: BTreeMap<UserId, RequestToken>,
    /// Users who currently like this property.
    pub liked_by: BTreeSet<UserId>,
    /// Thumbnail image reference.
    pub thumbnail: Option<ImageRef>,
    /// Gallery image references.
    pub pictures: Vec<ImageRef>,
    /// Creation timestamp, unix milliseconds.
    pub created_at: u64,
    /// Last-modified timestamp, unix milliseconds.
    pub updated_at: u64,
}

impl Property {
    /// Build an Available property from a listing payload.
    #[must_use]
    pub fn from_listing(id: PropertyId, owner_id: UserId, listing: NewListing, now: u64) -> Self {
        Self {
            id,
            owner_id,
            title: listing.title,
            description: listing.description,
            price: listing.price,
            location: listing.location,
            state: PropertyState::Available,
            active_tenant_id: None,
            pending: BTreeMap::new(),
            liked_by: BTreeSet::new(),
            thumbnail: listing.thumbnail,
            pictures: listing.pictures,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the property is open for rental requests.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == PropertyState::Available
    }

    /// Whether the property currently has an active tenant.
    #[must_use]
    pub fn is_rented(&self) -> bool {
        self.state == PropertyState::Rented
    }

    /// Renters with an outstanding request, in stable order.
    #[must_use]
    pub fn pending_requesters(&self) -> Vec<UserId> {
        self.pending.keys().cloned().collect()
    }

    /// Whether `renter` has an outstanding request.
    #[must_use]
    pub fn has_pending_request(&self, renter: &UserId) -> bool {
        self.pending.contains_key(renter)
    }

    /// Whether `user` currently likes this property.
    #[must_use]
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }

    /// Verify the record's invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant. A violation means a
    /// transition produced an illegal record; the store discards it.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match (&self.state, &self.active_tenant_id) {
            (PropertyState::Available, Some(_)) => {
                return Err(InvariantViolation::TenantWhileAvailable);
            },
            (PropertyState::Rented, None) => {
                return Err(InvariantViolation::RentedWithoutTenant);
            },
            _ => {},
        }

        if let Some(tenant) = &self.active_tenant_id {
            if self.pending.contains_key(tenant) {
                return Err(InvariantViolation::TenantStillPending(tenant.clone()));
            }
        }

        if self.price == 0 {
            return Err(InvariantViolation::NonPositivePrice);
        }

        Ok(())
    }
}

/// Filter for listing Available properties.
///
/// Both fields are optional; an empty filter matches everything.
/// Matching is a case-insensitive substring test against the title and
/// location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Restrict to properties whose location contains this text.
    pub location: Option<String>,
    /// Free-text search over title and location.
    pub search: Option<String>,
}

impl ListingFilter {
    /// Filter matching every property.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether `property` passes the filter.
    #[must_use]
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(location) = &self.location {
            if !contains_ci(&property.location, location) {
                return false;
            }
        }

        if let Some(search) = &self.search {
            if !contains_ci(&property.title, search) && !contains_ci(&property.location, search) {
                return false;
            }
        }

        true
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

//! Error taxonomy for the rental engine.
//!
//! Conflict outcomes (`AlreadyRented`, `NotPending`, `DuplicateRequest`,
//! `NotFound`) are *expected* results of races between renters and
//! owners. They are typed variants returned from transitions, never
//! panics, and are never silently retried. Only invariant violations
//! indicate bugs, and even those abort the offending transition only.

use thiserror::Error;

use crate::property::{InvariantViolation, PropertyId};

/// Outcome of a property transition that did not commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Unknown property id. Terminal; surfaced to the caller.
    #[error("property {0} not found")]
    NotFound(PropertyId),

    /// The property already has an active tenant.
    #[error("property is already rented")]
    AlreadyRented,

    /// The renter already has an outstanding request for this property
    /// (submitted with a different idempotency token).
    #[error("renter already has a pending request for this property")]
    DuplicateRequest,

    /// The renter has no outstanding request to accept or reject.
    #[error("no pending request from this renter")]
    NotPending,

    /// The transition produced a record that violates an invariant.
    /// The store discarded it; the canonical record is unchanged.
    #[error("transition aborted: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Error surfaced to a Sync Client consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The authority refused the transition. Any optimistic local
    /// mutation has been rolled back.
    #[error(transparent)]
    Conflict(#[from] TransitionError),

    /// Transient network failure. Optimistic state rolled back; the
    /// caller may retry with the same idempotency token.
    #[error("network failure talking to the authority")]
    NetworkFailure,

    /// The authority is unreachable. Fatal for this operation; stale
    /// cached reads remain available.
    #[error("authority unavailable")]
    AuthorityUnavailable,

    /// The local waiter was detached before the result arrived. The
    /// authority may or may not have committed the effect.
    #[error("write cancelled before the result arrived")]
    Cancelled,

    /// The local snapshot could not be encoded or decoded.
    #[error("snapshot corrupt or unreadable: {0}")]
    Snapshot(String),
}

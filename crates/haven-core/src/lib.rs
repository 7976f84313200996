//! Haven rental engine core logic
//!
//! Domain types and shared seams for the rental lifecycle engine,
//! completely decoupled from I/O. This enables deterministic testing of
//! the authority and the sync client against the same model.
//!
//! # Architecture
//!
//! The canonical `Property` record and its invariants live here. State
//! transitions themselves are pure functions over these types; the
//! authority crate serializes them per property, and the client crate
//! caches their results. All external effects (time, persistence) are
//! supplied explicitly through the [`mod@env`] and [`snapshot`] seams.
//!
//! # Components
//!
//! - [`property`]: Canonical property record, ids, listing filter
//! - [`authority`]: The boundary trait clients talk through
//! - [`session`]: Verified user context threaded into client calls
//! - [`error`]: Conflict and sync error taxonomy
//! - [`mod@env`]: Environment abstraction (time)
//! - [`snapshot`]: Consumer-side key-value persistence seam

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authority;
pub mod env;
pub mod error;
pub mod property;
pub mod session;
pub mod snapshot;

pub use authority::{Authority, AuthorityError, LikeOutcome};
pub use env::{Environment, SystemEnv};
pub use error::{SyncError, TransitionError};
pub use property::{
    ImageRef, InvariantViolation, ListingFilter, NewListing, Property, PropertyId, PropertyState,
    RequestToken, UserId,
};
pub use session::Session;
pub use snapshot::{LocalSnapshot, MemorySnapshotStore, SnapshotStore};

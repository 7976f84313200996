//! Authority side of the Haven rental engine.
//!
//! Owns the canonical property records and serializes every state
//! transition per property. Concurrent operations against *different*
//! properties proceed fully in parallel; operations against the *same*
//! property serialize, giving linearizability per property. No
//! isolation exists or is needed across properties.
//!
//! # Architecture: Pure Transitions, Declarative Actions
//!
//! Transitions are pure functions from a property record to the next
//! record plus declarative [`CoordinatorAction`]s. The store runs a
//! transition under the property's exclusive section and commits the
//! result only if the record's invariants hold. Side effects the
//! actions describe (owner notification) are executed by whatever
//! runtime embeds the engine, never in here.
//!
//! # Components
//!
//! - [`transition`]: Pure per-property transition functions
//! - [`store`]: Canonical records and the only write path
//! - [`coordinator`]: Rental request operations
//! - [`likes`]: Per-user liked sets
//! - [`engine`]: Facade implementing the [`haven_core::Authority`] seam

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod engine;
pub mod likes;
pub mod store;
pub mod transition;

pub use coordinator::{RequestCoordinator, TransitionOutcome};
pub use engine::RentalEngine;
pub use likes::LikeTracker;
pub use store::PropertyStore;
pub use transition::CoordinatorAction;

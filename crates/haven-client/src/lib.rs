//! Sync client for the Haven rental engine.
//!
//! Bridges a consumer (UI or background job) to the authority with a
//! local cache of last-known property and like state. Reads are
//! stale-while-revalidate: the cached value returns immediately and a
//! refresh runs in the background when the value has aged past the
//! refresh interval. Writes go to the authority and reconcile the cache
//! against the returned canonical record, never against an optimistic
//! guess. The exception is like toggles, which apply optimistically and
//! roll back on failure.
//!
//! # Components
//!
//! - [`PropertyCache`]: Last-known snapshots plus the local liked set
//! - [`SyncClient`]: The consumer-facing surface
//! - [`WriteHandle`]: Detachable waiter for an in-flight write

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod sync;

pub use cache::{CacheConfig, CachedRead, PropertyCache};
pub use sync::{SyncClient, WriteHandle, WriteOp, WriteOutcome};

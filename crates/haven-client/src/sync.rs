//! The consumer-facing sync surface.
//!
//! Every operation threads the caller's [`Session`] explicitly; there
//! is no ambient current-user state. Writes reconcile the local cache
//! against the canonical record the authority returns. Like toggles
//! additionally apply optimistically before the round trip and roll
//! back on failure; rental transitions never guess, because their
//! consequences are visible to other users.
//!
//! # Cancellation
//!
//! [`SyncClient::spawn_write`] returns a [`WriteHandle`]: a detachable
//! waiter over the in-flight write. Detaching never interrupts the
//! write itself; once sent, the effect lands at the authority exactly
//! as if the caller had waited (at-least-once effect, at-most-once
//! result delivery).

use std::sync::Arc;

use haven_core::{
    authority::Authority,
    env::Environment,
    error::SyncError,
    property::{ListingFilter, Property, PropertyId, RequestToken, UserId},
    session::Session,
    snapshot::{LocalSnapshot, SnapshotStore},
};
use tokio::sync::{Mutex, MutexGuard, oneshot};

use crate::cache::{CacheConfig, CachedRead, PropertyCache};

/// A write operation for [`SyncClient::spawn_write`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Submit a rental request for the session user.
    RequestRental {
        /// Target property.
        property_id: PropertyId,
        /// Idempotency token; reuse on retry.
        token: RequestToken,
    },
    /// Accept a renter's request on an owned property.
    AcceptRequest {
        /// Target property.
        property_id: PropertyId,
        /// Renter to accept.
        renter: UserId,
    },
    /// Reject a renter's request on an owned property.
    RejectRequest {
        /// Target property.
        property_id: PropertyId,
        /// Renter to reject.
        renter: UserId,
    },
    /// Flip the session user's like.
    ToggleLike {
        /// Target property.
        property_id: PropertyId,
    },
}

/// Result of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A rental transition committed; the canonical record after it.
    Updated(Property),
    /// A like toggle committed; whether the property is now liked.
    Liked(bool),
}

/// Detachable waiter for an in-flight write.
pub struct WriteHandle {
    result: oneshot::Receiver<Result<WriteOutcome, SyncError>>,
}

impl WriteHandle {
    /// Wait for the write's result.
    ///
    /// # Errors
    /// The write's own error, or `Cancelled` if the result was lost.
    pub async fn join(self) -> Result<WriteOutcome, SyncError> {
        self.result.await.unwrap_or(Err(SyncError::Cancelled))
    }

    /// Detach from the write. The write itself continues; a committed
    /// effect at the authority stays committed. Only the local waiter
    /// goes away.
    pub fn detach(self) {
        drop(self);
    }
}

struct Inner<E: Environment, A: Authority> {
    session: Session,
    env: E,
    authority: Arc<A>,
    config: CacheConfig,
    cache: Mutex<PropertyCache>,
    snapshots: Arc<dyn SnapshotStore>,
}

/// Client-side bridge between a consumer and the authority.
pub struct SyncClient<E: Environment, A: Authority> {
    inner: Arc<Inner<E, A>>,
}

impl<E: Environment, A: Authority> Clone for SyncClient<E, A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Environment, A: Authority> SyncClient<E, A> {
    /// Create a client for one signed-in session.
    pub fn new(
        session: Session,
        env: E,
        authority: Arc<A>,
        snapshots: Arc<dyn SnapshotStore>,
        config: CacheConfig,
    ) -> Self {
        let cache = Mutex::new(PropertyCache::new(session.user_id.clone()));
        Self { inner: Arc::new(Inner { session, env, authority, config, cache, snapshots }) }
    }

    /// The session this client acts for.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Read a property from the local cache.
    ///
    /// Returns immediately with the last-known value. If the value is
    /// missing or older than the refresh interval, a revalidation is
    /// started in the background; the caller may observe a value up to
    /// one refresh interval old.
    pub async fn read(&self, id: &PropertyId) -> CachedRead {
        let now = self.inner.env.now();
        let (property, stale) = {
            let cache = self.inner.cache.lock().await;
            let stale = cache.is_stale(id, now, self.inner.config.refresh_interval);
            (cache.get(id).cloned(), stale)
        };

        if stale {
            let client = self.clone();
            let id = id.clone();
            drop(tokio::spawn(async move {
                if let Err(err) = client.refresh(&id).await {
                    tracing::debug!(property = %id, %err, "background refresh failed");
                }
            }));
        }

        CachedRead { property, stale }
    }

    /// Fetch the canonical record and update the cache.
    ///
    /// # Errors
    /// `Conflict(NotFound)` for an unknown id, or a network error; the
    /// cached value (if any) is left as it was.
    pub async fn refresh(&self, id: &PropertyId) -> Result<Property, SyncError> {
        let property = self.inner.authority.fetch(id).await?;
        let mut cache = self.inner.cache.lock().await;
        cache.insert(property.clone(), Some(self.inner.env.now()));
        self.persist(&cache);
        Ok(property)
    }

    /// Available properties matching `filter`, from the authority.
    /// Each returned record refreshes the cache.
    ///
    /// # Errors
    /// Network errors only; conflicts cannot arise from a read.
    pub async fn list_available(
        &self,
        filter: &ListingFilter,
    ) -> Result<Vec<Property>, SyncError> {
        let properties = self.inner.authority.list_available(filter).await?;
        let now = self.inner.env.now();
        let mut cache = self.inner.cache.lock().await;
        for property in &properties {
            cache.insert(property.clone(), Some(now));
        }
        self.persist(&cache);
        Ok(properties)
    }

    /// Properties the session user currently likes, from the authority.
    ///
    /// # Errors
    /// Network errors only.
    pub async fn list_liked(&self) -> Result<Vec<Property>, SyncError> {
        let properties = self.inner.authority.list_liked(&self.inner.session.user_id).await?;
        let now = self.inner.env.now();
        let mut cache = self.inner.cache.lock().await;
        for property in &properties {
            cache.insert(property.clone(), Some(now));
        }
        self.persist(&cache);
        Ok(properties)
    }

    /// Properties the session user currently rents, from the
    /// authority. The tenant-side counterpart of
    /// [`Self::list_pending_for_owner`].
    ///
    /// # Errors
    /// Network errors only.
    pub async fn list_rented(&self) -> Result<Vec<Property>, SyncError> {
        let properties =
            self.inner.authority.list_rented_for_tenant(&self.inner.session.user_id).await?;
        let now = self.inner.env.now();
        let mut cache = self.inner.cache.lock().await;
        for property in &properties {
            cache.insert(property.clone(), Some(now));
        }
        self.persist(&cache);
        Ok(properties)
    }

    /// Pending requests across properties the session user owns.
    ///
    /// # Errors
    /// Network errors only.
    pub async fn list_pending_for_owner(
        &self,
    ) -> Result<Vec<(Property, Vec<UserId>)>, SyncError> {
        Ok(self.inner.authority.list_pending_for_owner(&self.inner.session.user_id).await?)
    }

    /// Flip the session user's like on a property.
    ///
    /// Applies to the local cache immediately so the surface reflects
    /// intent; the authority's canonical record then replaces the
    /// guess, or the flip is rolled back on failure.
    ///
    /// # Errors
    /// `Conflict(NotFound)`, `NetworkFailure` (after rollback), or
    /// `AuthorityUnavailable` (after rollback).
    pub async fn toggle_like(&self, id: &PropertyId) -> Result<bool, SyncError> {
        let optimistic = {
            let mut cache = self.inner.cache.lock().await;
            cache.flip_like(id)
        };
        tracing::debug!(property = %id, optimistic, "optimistic like applied");

        let user = self.inner.session.user_id.clone();
        let result = self
            .with_timeout(self.inner.authority.toggle_like(&user, id))
            .await;

        match result {
            Ok(outcome) => {
                let mut cache = self.inner.cache.lock().await;
                cache.insert(outcome.property, Some(self.inner.env.now()));
                self.persist(&cache);
                Ok(outcome.liked)
            },
            Err(err) => {
                let mut cache = self.inner.cache.lock().await;
                cache.flip_like(id);
                tracing::debug!(property = %id, %err, "like rolled back");
                Err(err)
            },
        }
    }

    /// Submit a rental request for the session user.
    ///
    /// Not optimistic: the cache changes only once the authority
    /// confirms. Retries must reuse `token` to stay idempotent.
    ///
    /// # Errors
    /// `Conflict` (`NotFound`, `AlreadyRented`, `DuplicateRequest`) or
    /// a network error.
    pub async fn request_rental(
        &self,
        id: &PropertyId,
        token: RequestToken,
    ) -> Result<Property, SyncError> {
        let renter = self.inner.session.user_id.clone();
        let property = self
            .with_timeout(self.inner.authority.request_rental(id, &renter, token))
            .await?;
        self.commit(property).await
    }

    /// Accept `renter`'s request on a property the session user owns.
    ///
    /// # Errors
    /// `Conflict` (`NotFound`, `NotPending`) or a network error.
    pub async fn accept_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, SyncError> {
        let property = self
            .with_timeout(self.inner.authority.accept_request(id, renter))
            .await?;
        self.commit(property).await
    }

    /// Reject `renter`'s request on a property the session user owns.
    ///
    /// # Errors
    /// `Conflict` (`NotFound`, `NotPending`) or a network error.
    pub async fn reject_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, SyncError> {
        let property = self
            .with_timeout(self.inner.authority.reject_request(id, renter))
            .await?;
        self.commit(property).await
    }

    /// Administrative release of a rented property.
    ///
    /// # Errors
    /// `Conflict(NotFound)` or a network error.
    pub async fn release(&self, id: &PropertyId) -> Result<Property, SyncError> {
        let property = self.with_timeout(self.inner.authority.release(id)).await?;
        self.commit(property).await
    }

    /// Start a write without waiting for it.
    ///
    /// The returned handle can be joined for the result or detached;
    /// either way the write runs to completion.
    pub fn spawn_write(&self, op: WriteOp) -> WriteHandle {
        let (tx, rx) = oneshot::channel();
        let client = self.clone();
        drop(tokio::spawn(async move {
            let result = match op {
                WriteOp::RequestRental { property_id, token } => {
                    client.request_rental(&property_id, token).await.map(WriteOutcome::Updated)
                },
                WriteOp::AcceptRequest { property_id, renter } => {
                    client.accept_request(&property_id, &renter).await.map(WriteOutcome::Updated)
                },
                WriteOp::RejectRequest { property_id, renter } => {
                    client.reject_request(&property_id, &renter).await.map(WriteOutcome::Updated)
                },
                WriteOp::ToggleLike { property_id } => {
                    client.toggle_like(&property_id).await.map(WriteOutcome::Liked)
                },
            };
            // The waiter may have detached; the effect stands either way.
            drop(tx.send(result));
        }));
        WriteHandle { result: rx }
    }

    /// Persist the current cache as the user's local snapshot.
    ///
    /// # Errors
    /// `Snapshot` if encoding fails.
    pub async fn persist_snapshot(&self) -> Result<(), SyncError> {
        let cache = self.inner.cache.lock().await;
        let snapshot = cache.to_snapshot(self.inner.env.unix_millis());
        let bytes = snapshot.to_bytes().map_err(|e| SyncError::Snapshot(e.to_string()))?;
        self.inner.snapshots.set(&LocalSnapshot::key_for(&self.inner.session.user_id), bytes);
        Ok(())
    }

    /// Restore the cache from the user's persisted snapshot, if one
    /// exists. Restored entries read as stale until revalidated, so
    /// consumers keep working from the snapshot while the authority is
    /// unreachable.
    ///
    /// # Errors
    /// `Snapshot` if stored bytes exist but cannot be decoded.
    pub async fn load_snapshot(&self) -> Result<bool, SyncError> {
        let key = LocalSnapshot::key_for(&self.inner.session.user_id);
        let Some(bytes) = self.inner.snapshots.get(&key) else {
            return Ok(false);
        };
        let snapshot =
            LocalSnapshot::from_bytes(&bytes).map_err(|e| SyncError::Snapshot(e.to_string()))?;
        let mut cache = self.inner.cache.lock().await;
        cache.restore(snapshot);
        Ok(true)
    }

    /// Drop the user's persisted snapshot (sign-out path).
    pub fn clear_snapshot(&self) {
        self.inner.snapshots.clear(&LocalSnapshot::key_for(&self.inner.session.user_id));
    }

    async fn commit(&self, property: Property) -> Result<Property, SyncError> {
        let mut cache = self.inner.cache.lock().await;
        cache.insert(property.clone(), Some(self.inner.env.now()));
        self.persist(&cache);
        Ok(property)
    }

    /// Best-effort snapshot write after a successful sync. Failure to
    /// persist never fails the operation that triggered it.
    fn persist(&self, cache: &MutexGuard<'_, PropertyCache>) {
        let snapshot = cache.to_snapshot(self.inner.env.unix_millis());
        match snapshot.to_bytes() {
            Ok(bytes) => {
                self.inner
                    .snapshots
                    .set(&LocalSnapshot::key_for(&self.inner.session.user_id), bytes);
            },
            Err(err) => tracing::warn!(%err, "snapshot persist skipped"),
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = Result<T, haven_core::authority::AuthorityError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.inner.config.write_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::debug!(timeout = ?self.inner.config.write_timeout, "write timed out");
                Err(SyncError::NetworkFailure)
            },
        }
    }
}


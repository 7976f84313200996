//! Fault-injecting authority wrapper.
//!
//! Wraps any [`Authority`] and decides per call whether to pass it
//! through, fail it before it reaches the inner authority, or let the
//! inner authority commit and then lose the response. The last one
//! exercises the "effect committed, result never delivered" path that
//! cancellation and retry logic must survive.

use std::{
    collections::VecDeque,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use haven_core::{
    authority::{Authority, AuthorityError, LikeOutcome},
    property::{ListingFilter, Property, PropertyId, RequestToken, UserId},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A single injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail before the call reaches the authority.
    NetworkFailure,
    /// Authority reported unreachable.
    Unavailable,
    /// Let the authority commit, then lose the response.
    CommitThenDrop,
}

/// Deterministic plan deciding which calls fault.
///
/// Queued faults fire first, in order; after the queue drains, each
/// call independently fails with `failure_rate` probability from a
/// seeded RNG.
#[derive(Debug, Clone)]
pub struct FaultPlan {
    queued: VecDeque<Fault>,
    failure_rate: f64,
    rng: ChaCha8Rng,
}

impl FaultPlan {
    /// A plan that never faults.
    #[must_use]
    pub fn reliable() -> Self {
        Self::with_seed(0)
    }

    /// A plan with a deterministic RNG and no faults queued.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { queued: VecDeque::new(), failure_rate: 0.0, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Set the background random failure probability (0.0 to 1.0).
    #[must_use]
    pub fn failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate;
        self
    }

    /// Queue a fault to fire on the next call.
    pub fn push(&mut self, fault: Fault) {
        self.queued.push_back(fault);
    }

    fn next(&mut self) -> Option<Fault> {
        if let Some(fault) = self.queued.pop_front() {
            return Some(fault);
        }
        if self.failure_rate > 0.0 && self.rng.r#gen::<f64>() < self.failure_rate {
            return Some(Fault::NetworkFailure);
        }
        None
    }
}

/// An [`Authority`] that fails according to a [`FaultPlan`].
pub struct FlakyAuthority<A: Authority> {
    inner: A,
    plan: Mutex<FaultPlan>,
    calls: AtomicU64,
}

impl<A: Authority> FlakyAuthority<A> {
    /// Wrap `inner` with the given plan.
    pub fn new(inner: A, plan: FaultPlan) -> Self {
        Self { inner, plan: Mutex::new(plan), calls: AtomicU64::new(0) }
    }

    /// Wrap `inner` with a plan that never faults.
    pub fn reliable(inner: A) -> Self {
        Self::new(inner, FaultPlan::reliable())
    }

    /// Queue a fault for the next call.
    pub fn inject(&self, fault: Fault) {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner).push(fault);
    }

    /// Total calls observed, faulted or not.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// The wrapped authority.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn take_fault(&self) -> Option<Fault> {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner).next()
    }

    async fn guard<T, Fut>(
        &self,
        op: &'static str,
        call: impl FnOnce() -> Fut + Send,
    ) -> Result<T, AuthorityError>
    where
        Fut: Future<Output = Result<T, AuthorityError>> + Send,
        T: Send,
    {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.take_fault() {
            Some(Fault::NetworkFailure) => {
                tracing::debug!(op, "injected network failure");
                Err(AuthorityError::NetworkFailure)
            },
            Some(Fault::Unavailable) => {
                tracing::debug!(op, "injected unavailable");
                Err(AuthorityError::Unavailable)
            },
            Some(Fault::CommitThenDrop) => {
                tracing::debug!(op, "committing then dropping response");
                let _ = call().await;
                Err(AuthorityError::NetworkFailure)
            },
            None => call().await,
        }
    }
}

#[async_trait]
impl<A: Authority> Authority for FlakyAuthority<A> {
    async fn fetch(&self, id: &PropertyId) -> Result<Property, AuthorityError> {
        self.guard("fetch", || self.inner.fetch(id)).await
    }

    async fn list_available(
        &self,
        filter: &ListingFilter,
    ) -> Result<Vec<Property>, AuthorityError> {
        self.guard("list_available", || self.inner.list_available(filter)).await
    }

    async fn request_rental(
        &self,
        id: &PropertyId,
        renter: &UserId,
        token: RequestToken,
    ) -> Result<Property, AuthorityError> {
        self.guard("request_rental", || self.inner.request_rental(id, renter, token)).await
    }

    async fn accept_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError> {
        self.guard("accept_request", || self.inner.accept_request(id, renter)).await
    }

    async fn reject_request(
        &self,
        id: &PropertyId,
        renter: &UserId,
    ) -> Result<Property, AuthorityError> {
        self.guard("reject_request", || self.inner.reject_request(id, renter)).await
    }

    async fn release(&self, id: &PropertyId) -> Result<Property, AuthorityError> {
        self.guard("release", || self.inner.release(id)).await
    }

    async fn toggle_like(
        &self,
        user: &UserId,
        id: &PropertyId,
    ) -> Result<LikeOutcome, AuthorityError> {
        self.guard("toggle_like", || self.inner.toggle_like(user, id)).await
    }

    async fn list_liked(&self, user: &UserId) -> Result<Vec<Property>, AuthorityError> {
        self.guard("list_liked", || self.inner.list_liked(user)).await
    }

    async fn list_rented_for_tenant(
        &self,
        tenant: &UserId,
    ) -> Result<Vec<Property>, AuthorityError> {
        self.guard("list_rented_for_tenant", || self.inner.list_rented_for_tenant(tenant)).await
    }

    async fn list_pending_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<(Property, Vec<UserId>)>, AuthorityError> {
        self.guard("list_pending_for_owner", || self.inner.list_pending_for_owner(owner)).await
    }
}

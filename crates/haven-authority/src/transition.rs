//! Pure per-property transition functions.
//!
//! Each function maps the current record to the next record plus the
//! declarative actions the transition implies. No I/O, no locking, no
//! clock: the store supplies exclusion and timestamps. This keeps
//! correctness testable without mocking anything.

use haven_core::{
    error::TransitionError,
    property::{Property, PropertyId, PropertyState, RequestToken, UserId},
};

/// Declarative side effects produced by a transition.
///
/// The embedding runtime executes these (delivery mechanism is out of
/// the engine's scope); the engine itself only records intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorAction {
    /// A new rental request arrived; tell the owner.
    NotifyOwner {
        /// Owner to notify.
        owner_id: UserId,
        /// Property the request targets.
        property_id: PropertyId,
        /// Renter who submitted the request.
        renter_id: UserId,
    },

    /// A request was accepted; tell the new tenant.
    RequestAccepted {
        /// Property that was rented.
        property_id: PropertyId,
        /// The new tenant.
        renter_id: UserId,
    },

    /// A request was explicitly rejected; tell the renter.
    RequestRejected {
        /// Property the request targeted.
        property_id: PropertyId,
        /// The rejected renter.
        renter_id: UserId,
    },

    /// Competing requests were implicitly rejected by an accept.
    ///
    /// Accepting one request invalidates every other pending request
    /// on that property. This is deliberate policy, not cleanup
    /// left undone.
    RequestsInvalidated {
        /// Property that was rented.
        property_id: PropertyId,
        /// Renters whose requests were invalidated.
        renter_ids: Vec<UserId>,
    },
}

/// Result of a pure transition: the next record plus implied actions.
pub type Transition = (Property, Vec<CoordinatorAction>);

/// Submit a rental request from `renter`.
///
/// Retrying with the token already recorded for `renter` is an
/// idempotent no-op; a different token while a request is outstanding
/// is a duplicate.
///
/// # Errors
/// `AlreadyRented` if the property has an active tenant;
/// `DuplicateRequest` for a second distinct request from the same
/// renter.
pub fn request_rental(
    current: &Property,
    renter: &UserId,
    token: RequestToken,
) -> Result<Transition, TransitionError> {
    if current.is_rented() {
        return Err(TransitionError::AlreadyRented);
    }

    if let Some(existing) = current.pending.get(renter) {
        if *existing == token {
            // Retry of the same logical request; nothing to do.
            return Ok((current.clone(), Vec::new()));
        }
        return Err(TransitionError::DuplicateRequest);
    }

    let mut next = current.clone();
    next.pending.insert(renter.clone(), token);

    let actions = vec![CoordinatorAction::NotifyOwner {
        owner_id: next.owner_id.clone(),
        property_id: next.id.clone(),
        renter_id: renter.clone(),
    }];

    Ok((next, actions))
}

/// Accept `renter`'s pending request.
///
/// Promotes the renter to active tenant and clears the pending set;
/// every other pending renter is implicitly rejected and reported in
/// the returned actions.
///
/// # Errors
/// `NotPending` if the renter has no outstanding request or the
/// property is already rented.
pub fn accept_request(current: &Property, renter: &UserId) -> Result<Transition, TransitionError> {
    if current.is_rented() || !current.has_pending_request(renter) {
        return Err(TransitionError::NotPending);
    }

    let mut next = current.clone();
    let losers: Vec<UserId> = next.pending.keys().filter(|r| *r != renter).cloned().collect();
    next.pending.clear();
    next.state = PropertyState::Rented;
    next.active_tenant_id = Some(renter.clone());

    let mut actions = vec![CoordinatorAction::RequestAccepted {
        property_id: next.id.clone(),
        renter_id: renter.clone(),
    }];
    if !losers.is_empty() {
        actions.push(CoordinatorAction::RequestsInvalidated {
            property_id: next.id.clone(),
            renter_ids: losers,
        });
    }

    Ok((next, actions))
}

/// Reject `renter`'s pending request, leaving other requests alone.
///
/// # Errors
/// `NotPending` under the same condition as [`accept_request`].
pub fn reject_request(current: &Property, renter: &UserId) -> Result<Transition, TransitionError> {
    if current.is_rented() || !current.has_pending_request(renter) {
        return Err(TransitionError::NotPending);
    }

    let mut next = current.clone();
    next.pending.remove(renter);

    let actions = vec![CoordinatorAction::RequestRejected {
        property_id: next.id.clone(),
        renter_id: renter.clone(),
    }];

    Ok((next, actions))
}

/// Administrative reset: Rented back to Available.
///
/// Clears the active tenant and any pending requests. Idempotent on an
/// Available property.
///
/// # Errors
/// Never fails on a known property; the signature matches the other
/// transitions so it runs through the same write path.
pub fn release(current: &Property) -> Result<Transition, TransitionError> {
    if current.is_available() && current.pending.is_empty() {
        return Ok((current.clone(), Vec::new()));
    }

    let mut next = current.clone();
    next.state = PropertyState::Available;
    next.active_tenant_id = None;
    next.pending.clear();

    Ok((next, Vec::new()))
}

/// Flip `user`'s membership in the liked set.
///
/// Deliberately flip-count semantics inherited from the product: two
/// rapid toggles both succeed and net out. Returns whether the
/// property is liked after the flip.
///
/// # Errors
/// Never fails on a known property.
pub fn toggle_like(current: &Property, user: &UserId) -> Result<(Property, bool), TransitionError> {
    let mut next = current.clone();
    let liked = if next.liked_by.remove(user) {
        false
    } else {
        next.liked_by.insert(user.clone());
        true
    };
    Ok((next, liked))
}

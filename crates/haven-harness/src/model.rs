//! Reference model for model-based testing.
//!
//! [`ModelWorld`] is a deliberately naive re-statement of the rental
//! rules over plain collections. Property-based tests drive the real
//! engine and the model with the same operation sequence and require
//! identical results and final state; any divergence is a bug in one
//! of them.

use std::collections::{BTreeMap, BTreeSet};

/// One operation in a generated sequence.
///
/// Properties and users are small indices so proptest can shrink
/// sequences; the test maps them onto real ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Renter submits a rental request with an idempotency token.
    RequestRental {
        /// Property slot.
        property: usize,
        /// Requesting user slot.
        renter: usize,
        /// Idempotency token for the request.
        token: u64,
    },
    /// Owner accepts a pending request.
    AcceptRequest {
        /// Property slot.
        property: usize,
        /// User slot whose request is accepted.
        renter: usize,
    },
    /// Owner rejects a pending request.
    RejectRequest {
        /// Property slot.
        property: usize,
        /// User slot whose request is rejected.
        renter: usize,
    },
    /// Administrative reset back to available.
    Release {
        /// Property slot.
        property: usize,
    },
    /// User flips their like on a property.
    ToggleLike {
        /// Property slot.
        property: usize,
        /// User slot.
        user: usize,
    },
}

/// Outcome of applying an [`Operation`], abstracted over both worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// The operation succeeded (including idempotent no-ops).
    Ok,
    /// Rejected: the property already has a tenant.
    AlreadyRented,
    /// Rejected: a distinct request from the same renter is pending.
    DuplicateRequest,
    /// Rejected: the named renter has no pending request.
    NotPending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ModelProperty {
    rented_by: Option<usize>,
    pending: BTreeMap<usize, u64>,
    liked_by: BTreeSet<usize>,
}

/// Naive reference state: one [`ModelProperty`] per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelWorld {
    properties: Vec<ModelProperty>,
}

impl ModelWorld {
    /// A world with `properties` available slots, nothing pending.
    #[must_use]
    pub fn new(properties: usize) -> Self {
        Self { properties: vec![ModelProperty::default(); properties] }
    }

    /// Apply one operation and report the expected outcome.
    pub fn apply(&mut self, op: Operation) -> OperationResult {
        match op {
            Operation::RequestRental { property, renter, token } => {
                let p = &mut self.properties[property];
                if p.rented_by.is_some() {
                    return OperationResult::AlreadyRented;
                }
                match p.pending.get(&renter) {
                    Some(existing) if *existing == token => OperationResult::Ok,
                    Some(_) => OperationResult::DuplicateRequest,
                    None => {
                        p.pending.insert(renter, token);
                        OperationResult::Ok
                    },
                }
            },
            Operation::AcceptRequest { property, renter } => {
                let p = &mut self.properties[property];
                if p.rented_by.is_some() || !p.pending.contains_key(&renter) {
                    return OperationResult::NotPending;
                }
                p.pending.clear();
                p.rented_by = Some(renter);
                OperationResult::Ok
            },
            Operation::RejectRequest { property, renter } => {
                let p = &mut self.properties[property];
                if p.rented_by.is_some() || !p.pending.contains_key(&renter) {
                    return OperationResult::NotPending;
                }
                p.pending.remove(&renter);
                OperationResult::Ok
            },
            Operation::Release { property } => {
                let p = &mut self.properties[property];
                p.rented_by = None;
                p.pending.clear();
                OperationResult::Ok
            },
            Operation::ToggleLike { property, user } => {
                let p = &mut self.properties[property];
                if !p.liked_by.remove(&user) {
                    p.liked_by.insert(user);
                }
                OperationResult::Ok
            },
        }
    }

    /// Active tenant slot for a property, if rented.
    #[must_use]
    pub fn rented_by(&self, property: usize) -> Option<usize> {
        self.properties[property].rented_by
    }

    /// Pending requester slots for a property, in order.
    #[must_use]
    pub fn pending(&self, property: usize) -> Vec<usize> {
        self.properties[property].pending.keys().copied().collect()
    }

    /// Whether `user` currently likes `property`.
    #[must_use]
    pub fn is_liked_by(&self, property: usize, user: usize) -> bool {
        self.properties[property].liked_by.contains(&user)
    }

    /// Number of property slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the world has no property slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelWorld, Operation, OperationResult};

    #[test]
    fn accept_clears_competing_requests() {
        let mut world = ModelWorld::new(1);
        world.apply(Operation::RequestRental { property: 0, renter: 1, token: 1 });
        world.apply(Operation::RequestRental { property: 0, renter: 2, token: 2 });

        let result = world.apply(Operation::AcceptRequest { property: 0, renter: 1 });
        assert_eq!(result, OperationResult::Ok);
        assert_eq!(world.rented_by(0), Some(1));
        assert!(world.pending(0).is_empty());

        // The loser's request is gone, not merely deprioritized.
        let result = world.apply(Operation::AcceptRequest { property: 0, renter: 2 });
        assert_eq!(result, OperationResult::NotPending);
    }

    #[test]
    fn token_retry_is_ok_but_new_token_is_duplicate() {
        let mut world = ModelWorld::new(1);
        world.apply(Operation::RequestRental { property: 0, renter: 1, token: 9 });

        let retry = world.apply(Operation::RequestRental { property: 0, renter: 1, token: 9 });
        assert_eq!(retry, OperationResult::Ok);

        let fresh = world.apply(Operation::RequestRental { property: 0, renter: 1, token: 10 });
        assert_eq!(fresh, OperationResult::DuplicateRequest);
    }

    #[test]
    fn release_reopens_for_new_requests() {
        let mut world = ModelWorld::new(1);
        world.apply(Operation::RequestRental { property: 0, renter: 1, token: 1 });
        world.apply(Operation::AcceptRequest { property: 0, renter: 1 });
        world.apply(Operation::Release { property: 0 });

        let result = world.apply(Operation::RequestRental { property: 0, renter: 2, token: 2 });
        assert_eq!(result, OperationResult::Ok);
        assert_eq!(world.rented_by(0), None);
    }
}

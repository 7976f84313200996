//! Model-based property tests.
//!
//! Generates random operation sequences and verifies that the real
//! engine behaves identically to the reference model: same per-step
//! results, same final tenants, pending sets, and liked sets, with the
//! state invariants holding after every step.

use haven_authority::RentalEngine;
use haven_core::{
    error::TransitionError,
    property::{NewListing, PropertyId, RequestToken, UserId},
    session::Session,
};
use haven_harness::{ModelWorld, Operation, OperationResult, SimEnv};
use proptest::prelude::*;

const NUM_PROPERTIES: usize = 3;
const NUM_USERS: usize = 3;

/// Real engine wrapper mirroring the model's slot-indexed interface.
struct RealWorld {
    runtime: tokio::runtime::Runtime,
    engine: RentalEngine<SimEnv>,
    ids: Vec<PropertyId>,
    users: Vec<UserId>,
}

impl RealWorld {
    fn new(num_properties: usize, num_users: usize) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let engine = RentalEngine::new(SimEnv::new());

        let owner = Session::new(UserId::new("owner"), "owner@model.test", "Owner");
        let ids = runtime.block_on(async {
            let mut ids = Vec::with_capacity(num_properties);
            for i in 0..num_properties {
                let property = engine
                    .ingest(
                        NewListing {
                            title: format!("listing {i}"),
                            description: String::new(),
                            price: 50_000,
                            location: "Ghent".to_string(),
                            thumbnail: None,
                            pictures: Vec::new(),
                        },
                        &owner,
                    )
                    .await;
                ids.push(property.id);
            }
            ids
        });

        let users = (0..num_users).map(|i| UserId::new(format!("user-{i}"))).collect();

        Self { runtime, engine, ids, users }
    }

    fn apply(&mut self, op: Operation) -> OperationResult {
        let result: Result<(), TransitionError> = self.runtime.block_on(async {
            match op {
                Operation::RequestRental { property, renter, token } => self
                    .engine
                    .coordinator()
                    .request_rental(
                        &self.ids[property],
                        &self.users[renter],
                        RequestToken::new(token),
                    )
                    .await
                    .map(|_| ()),
                Operation::AcceptRequest { property, renter } => self
                    .engine
                    .coordinator()
                    .accept_request(&self.ids[property], &self.users[renter])
                    .await
                    .map(|_| ()),
                Operation::RejectRequest { property, renter } => self
                    .engine
                    .coordinator()
                    .reject_request(&self.ids[property], &self.users[renter])
                    .await
                    .map(|_| ()),
                Operation::Release { property } => {
                    self.engine.coordinator().release(&self.ids[property]).await.map(|_| ())
                },
                Operation::ToggleLike { property, user } => self
                    .engine
                    .likes()
                    .toggle_like(&self.users[user], &self.ids[property])
                    .await
                    .map(|_| ()),
            }
        });

        match result {
            Ok(()) => OperationResult::Ok,
            Err(TransitionError::AlreadyRented) => OperationResult::AlreadyRented,
            Err(TransitionError::DuplicateRequest) => OperationResult::DuplicateRequest,
            Err(TransitionError::NotPending) => OperationResult::NotPending,
            Err(other) => panic!("unexpected engine error for {op:?}: {other}"),
        }
    }

    fn rented_by(&self, property: usize) -> Option<usize> {
        let record = self
            .runtime
            .block_on(self.engine.store().get(&self.ids[property]))
            .expect("known property");
        record
            .active_tenant_id
            .map(|tenant| self.users.iter().position(|u| *u == tenant).expect("known user"))
    }

    fn pending(&self, property: usize) -> Vec<usize> {
        let record = self
            .runtime
            .block_on(self.engine.store().get(&self.ids[property]))
            .expect("known property");
        record
            .pending_requesters()
            .iter()
            .map(|r| self.users.iter().position(|u| u == r).expect("known user"))
            .collect()
    }

    fn is_liked_by(&self, property: usize, user: usize) -> bool {
        let record = self
            .runtime
            .block_on(self.engine.store().get(&self.ids[property]))
            .expect("known property");
        record.is_liked_by(&self.users[user])
    }

    fn check_invariants(&self) {
        let properties = self.runtime.block_on(self.engine.store().list_all());
        for property in properties {
            property.check_invariants().expect("state invariants");
        }
    }
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let property = 0..NUM_PROPERTIES;
    let user = 0..NUM_USERS;
    // Small token space so retries and token collisions actually occur.
    let token = 1..4u64;

    prop_oneof![
        4 => (property.clone(), user.clone(), token).prop_map(|(p, r, t)| {
            Operation::RequestRental { property: p, renter: r, token: t }
        }),
        3 => (property.clone(), user.clone())
            .prop_map(|(p, r)| Operation::AcceptRequest { property: p, renter: r }),
        2 => (property.clone(), user.clone())
            .prop_map(|(p, r)| Operation::RejectRequest { property: p, renter: r }),
        1 => property.clone().prop_map(|p| Operation::Release { property: p }),
        3 => (property, user).prop_map(|(p, u)| Operation::ToggleLike { property: p, user: u }),
    ]
}

proptest! {
    /// Per-step results and final state match between model and engine.
    #[test]
    fn prop_model_matches_engine(
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let mut model = ModelWorld::new(NUM_PROPERTIES);
        let mut real = RealWorld::new(NUM_PROPERTIES, NUM_USERS);

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(*op);
            let real_result = real.apply(*op);

            prop_assert_eq!(
                model_result, real_result,
                "divergence at operation {}: {:?}", i, op
            );
            real.check_invariants();
        }

        for p in 0..NUM_PROPERTIES {
            prop_assert_eq!(model.rented_by(p), real.rented_by(p), "tenant of property {}", p);
            prop_assert_eq!(model.pending(p), real.pending(p), "pending set of property {}", p);
            for u in 0..NUM_USERS {
                prop_assert_eq!(
                    model.is_liked_by(p, u),
                    real.is_liked_by(p, u),
                    "like ({}, {})", p, u
                );
            }
        }
    }

    /// A rented property never accepts a new request until released.
    #[test]
    fn prop_rented_property_rejects_requests(
        ops in prop::collection::vec(operation_strategy(), 0..40)
    ) {
        let mut model = ModelWorld::new(NUM_PROPERTIES);

        model.apply(Operation::RequestRental { property: 0, renter: 0, token: 1 });
        model.apply(Operation::AcceptRequest { property: 0, renter: 0 });

        for op in ops {
            // Keep property 0 rented: filter out releases on it.
            if matches!(op, Operation::Release { property: 0 }) {
                continue;
            }
            let result = model.apply(op);
            if let Operation::RequestRental { property: 0, .. } = op {
                prop_assert_eq!(result, OperationResult::AlreadyRented);
            }
        }

        prop_assert_eq!(model.rented_by(0), Some(0));
    }

    /// Accepting always leaves exactly one tenant and no pending set.
    #[test]
    fn prop_accept_is_exclusive(
        requesters in prop::collection::btree_set(0..NUM_USERS, 1..=NUM_USERS),
        winner_index in any::<prop::sample::Index>()
    ) {
        let mut model = ModelWorld::new(1);
        let requesters: Vec<usize> = requesters.into_iter().collect();
        let winner = requesters[winner_index.index(requesters.len())];

        for (i, renter) in requesters.iter().enumerate() {
            let result = model.apply(Operation::RequestRental {
                property: 0,
                renter: *renter,
                token: i as u64 + 1,
            });
            prop_assert_eq!(result, OperationResult::Ok);
        }

        prop_assert_eq!(
            model.apply(Operation::AcceptRequest { property: 0, renter: winner }),
            OperationResult::Ok
        );
        prop_assert_eq!(model.rented_by(0), Some(winner));
        prop_assert!(model.pending(0).is_empty());

        // Every other accept now fails; the losers were invalidated.
        for renter in requesters {
            prop_assert_eq!(
                model.apply(Operation::AcceptRequest { property: 0, renter }),
                OperationResult::NotPending
            );
        }
    }

    /// An even number of toggles from one user nets to not-liked, odd
    /// to liked, regardless of interleaved toggles by others.
    #[test]
    fn prop_toggle_parity(
        toggles in 1..8usize,
        others in prop::collection::vec(1..NUM_USERS, 0..6)
    ) {
        let mut model = ModelWorld::new(1);

        for user in &others {
            model.apply(Operation::ToggleLike { property: 0, user: *user });
        }
        for _ in 0..toggles {
            model.apply(Operation::ToggleLike { property: 0, user: 0 });
        }

        prop_assert_eq!(model.is_liked_by(0, 0), toggles % 2 == 1);
    }
}

#[test]
fn engine_smoke_full_lifecycle() {
    let mut real = RealWorld::new(1, 2);

    assert_eq!(
        real.apply(Operation::RequestRental { property: 0, renter: 0, token: 1 }),
        OperationResult::Ok
    );
    assert_eq!(
        real.apply(Operation::RequestRental { property: 0, renter: 1, token: 2 }),
        OperationResult::Ok
    );
    assert_eq!(
        real.apply(Operation::AcceptRequest { property: 0, renter: 1 }),
        OperationResult::Ok
    );
    assert_eq!(real.rented_by(0), Some(1));

    // The losing request was cleared by the accept.
    assert_eq!(
        real.apply(Operation::AcceptRequest { property: 0, renter: 0 }),
        OperationResult::NotPending
    );

    assert_eq!(real.apply(Operation::Release { property: 0 }), OperationResult::Ok);
    assert_eq!(real.rented_by(0), None);
    assert_eq!(
        real.apply(Operation::RequestRental { property: 0, renter: 0, token: 3 }),
        OperationResult::Ok
    );
}

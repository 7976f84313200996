//! Request coordinator tests.
//!
//! Exercises the rental lifecycle through the public engine surface:
//! request/accept/reject/release, owner review, and the per-property
//! serialization guarantees under real concurrency.

use std::sync::Arc;

use haven_authority::{CoordinatorAction, RentalEngine};
use haven_core::{
    env::SystemEnv,
    error::TransitionError,
    property::{ListingFilter, NewListing, Property, PropertyId, PropertyState, RequestToken, UserId},
    session::Session,
};
use tokio::sync::Barrier;

fn owner_session() -> Session {
    Session::new(UserId::new("owner"), "owner@example.com", "Owner")
}

fn listing(title: &str, location: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        description: "two rooms, one cat allowed".to_string(),
        price: 120_000,
        location: location.to_string(),
        thumbnail: None,
        pictures: Vec::new(),
    }
}

async fn seeded_engine() -> (RentalEngine<SystemEnv>, Property) {
    let engine = RentalEngine::new(SystemEnv);
    let property = engine.ingest(listing("Canal house", "Utrecht"), &owner_session()).await;
    (engine, property)
}

fn renter(name: &str) -> UserId {
    UserId::new(name)
}

#[tokio::test]
async fn request_records_pending_and_notifies_owner() {
    let (engine, p) = seeded_engine().await;

    let outcome = engine
        .coordinator()
        .request_rental(&p.id, &renter("a"), RequestToken::new(1))
        .await
        .unwrap();

    assert!(outcome.property.has_pending_request(&renter("a")));
    assert!(matches!(outcome.actions.as_slice(), [CoordinatorAction::NotifyOwner { .. }]));
}

#[tokio::test]
async fn accept_rents_to_requester_and_competitor_gets_not_pending() {
    // The headline scenario: A and B both request, owner accepts A,
    // then accepting B must fail.
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.request_rental(&p.id, &renter("b"), RequestToken::new(2)).await.unwrap();

    let accepted = coordinator.accept_request(&p.id, &renter("a")).await.unwrap();
    assert_eq!(accepted.property.state, PropertyState::Rented);
    assert_eq!(accepted.property.active_tenant_id, Some(renter("a")));
    assert!(accepted.property.pending.is_empty());

    let invalidated = accepted.actions.iter().find_map(|a| match a {
        CoordinatorAction::RequestsInvalidated { renter_ids, .. } => Some(renter_ids.clone()),
        _ => None,
    });
    assert_eq!(invalidated, Some(vec![renter("b")]));

    let result = coordinator.accept_request(&p.id, &renter("b")).await;
    assert_eq!(result.unwrap_err(), TransitionError::NotPending);
}

#[tokio::test]
async fn reject_keeps_other_requesters() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.request_rental(&p.id, &renter("b"), RequestToken::new(2)).await.unwrap();

    let outcome = coordinator.reject_request(&p.id, &renter("a")).await.unwrap();
    assert!(!outcome.property.has_pending_request(&renter("a")));
    assert!(outcome.property.has_pending_request(&renter("b")));
    assert_eq!(outcome.property.state, PropertyState::Available);
}

#[tokio::test]
async fn request_on_rented_property_never_mutates() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.accept_request(&p.id, &renter("a")).await.unwrap();
    let before = engine.store().get(&p.id).await.unwrap();

    let result = coordinator.request_rental(&p.id, &renter("b"), RequestToken::new(2)).await;
    assert_eq!(result.unwrap_err(), TransitionError::AlreadyRented);

    let after = engine.store().get(&p.id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn retried_request_with_same_token_is_accepted_once() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();
    let token = RequestToken::new(99);

    coordinator.request_rental(&p.id, &renter("a"), token).await.unwrap();
    let retry = coordinator.request_rental(&p.id, &renter("a"), token).await.unwrap();

    assert!(retry.actions.is_empty(), "retry must not re-notify");
    assert_eq!(retry.property.pending_requesters(), vec![renter("a")]);

    // A genuinely new request from the same renter is a duplicate.
    let result = coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(100)).await;
    assert_eq!(result.unwrap_err(), TransitionError::DuplicateRequest);
}

#[tokio::test]
async fn release_reopens_the_property() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.accept_request(&p.id, &renter("a")).await.unwrap();

    let released = coordinator.release(&p.id).await.unwrap();
    assert_eq!(released.property.state, PropertyState::Available);
    assert_eq!(released.property.active_tenant_id, None);

    // New requests are accepted again.
    coordinator.request_rental(&p.id, &renter("b"), RequestToken::new(2)).await.unwrap();
}

#[tokio::test]
async fn operations_on_unknown_property_fail_with_not_found() {
    let engine = RentalEngine::new(SystemEnv);
    let missing = PropertyId::new("ghost");

    let result = engine
        .coordinator()
        .request_rental(&missing, &renter("a"), RequestToken::new(1))
        .await;
    assert_eq!(result.unwrap_err(), TransitionError::NotFound(missing));
}

#[tokio::test]
async fn list_pending_for_owner_groups_requesters() {
    let engine = RentalEngine::new(SystemEnv);
    let owner = owner_session();
    let other_owner = Session::new(UserId::new("other"), "other@example.com", "Other");

    let p1 = engine.ingest(listing("A", "Oslo"), &owner).await;
    let p2 = engine.ingest(listing("B", "Oslo"), &owner).await;
    let p3 = engine.ingest(listing("C", "Oslo"), &other_owner).await;

    let coordinator = engine.coordinator();
    coordinator.request_rental(&p1.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.request_rental(&p1.id, &renter("b"), RequestToken::new(2)).await.unwrap();
    coordinator.request_rental(&p3.id, &renter("c"), RequestToken::new(3)).await.unwrap();

    let mut review = coordinator.list_pending_for_owner(&owner.user_id).await;
    review.sort_by(|(a, _), (b, _)| a.id.cmp(&b.id));

    assert_eq!(review.len(), 1, "p2 has no requests, p3 belongs to someone else");
    assert_eq!(review[0].0.id, p1.id);
    assert_eq!(review[0].1, vec![renter("a"), renter("b")]);
    let _ = p2;
}

#[tokio::test]
async fn list_rented_for_tenant_follows_accept_and_release() {
    let engine = RentalEngine::new(SystemEnv);
    let owner = owner_session();

    let p1 = engine.ingest(listing("A", "Oslo"), &owner).await;
    let p2 = engine.ingest(listing("B", "Oslo"), &owner).await;
    let p3 = engine.ingest(listing("C", "Oslo"), &owner).await;

    let coordinator = engine.coordinator();
    let tenant = renter("t");
    assert!(coordinator.list_rented_for_tenant(&tenant).await.is_empty());

    for (p, token) in [(&p1, 1_u64), (&p2, 2)] {
        coordinator.request_rental(&p.id, &tenant, RequestToken::new(token)).await.unwrap();
        coordinator.accept_request(&p.id, &tenant).await.unwrap();
    }
    // Pending on p3, never accepted.
    coordinator.request_rental(&p3.id, &tenant, RequestToken::new(3)).await.unwrap();

    let mut rented = coordinator.list_rented_for_tenant(&tenant).await;
    rented.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(rented.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![
        p1.id.clone(),
        p2.id.clone()
    ]);

    // A pending request is not a rental, and another user sees nothing.
    assert!(coordinator.list_rented_for_tenant(&renter("nobody")).await.is_empty());

    coordinator.release(&p1.id).await.unwrap();
    let rented = coordinator.list_rented_for_tenant(&tenant).await;
    assert_eq!(rented.len(), 1);
    assert_eq!(rented[0].id, p2.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_from_two_renters_both_land() {
    let (engine, p) = seeded_engine().await;
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for (name, token) in [("r1", 1_u64), ("r2", 2)] {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let id = p.id.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine
                .coordinator()
                .request_rental(&id, &UserId::new(name), RequestToken::new(token))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = engine.store().get(&p.id).await.unwrap();
    assert_eq!(record.pending_requesters(), vec![renter("r1"), renter("r2")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_accepts_produce_exactly_one_tenant() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.request_rental(&p.id, &renter("b"), RequestToken::new(2)).await.unwrap();

    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for name in ["a", "b"] {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let id = p.id.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.coordinator().accept_request(&id, &UserId::new(name)).await
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(TransitionError::NotPending) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((winners, losers), (1, 1));

    let record = engine.store().get(&p.id).await.unwrap();
    assert_eq!(record.state, PropertyState::Rented);
    assert!(record.active_tenant_id.is_some());
    assert!(record.pending.is_empty());
    record.check_invariants().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_properties_make_progress_independently() {
    let engine = Arc::new(RentalEngine::new(SystemEnv));
    let owner = owner_session();

    let mut ids = Vec::new();
    for i in 0..8 {
        let p = engine.ingest(listing(&format!("P{i}"), "Rotterdam"), &owner).await;
        ids.push(p.id);
    }

    // One full lifecycle per property, all properties in flight at once.
    let barrier = Arc::new(Barrier::new(ids.len()));
    let mut handles = Vec::new();
    for (i, id) in ids.iter().cloned().enumerate() {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            let tenant = UserId::new(format!("tenant-{i}"));
            barrier.wait().await;
            engine
                .coordinator()
                .request_rental(&id, &tenant, RequestToken::new(i as u64))
                .await?;
            engine.coordinator().accept_request(&id, &tenant).await?;
            engine.coordinator().release(&id).await?;
            Ok::<_, TransitionError>(())
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for id in &ids {
        let record = engine.store().get(id).await.unwrap();
        assert_eq!(record.state, PropertyState::Available);
        record.check_invariants().unwrap();
    }
}

#[tokio::test]
async fn like_toggle_flips_and_lists() {
    let (engine, p) = seeded_engine().await;
    let user = UserId::new("u1");

    let first = engine.likes().toggle_like(&user, &p.id).await.unwrap();
    assert!(first.liked);
    let liked = engine.likes().list_liked(&user).await;
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].id, p.id);

    let second = engine.likes().toggle_like(&user, &p.id).await.unwrap();
    assert!(!second.liked);
    assert!(engine.likes().list_liked(&user).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_net_to_flip_parity() {
    let (engine, p) = seeded_engine().await;
    let engine = Arc::new(engine);
    let user = UserId::new("u1");

    let toggles = 7;
    let barrier = Arc::new(Barrier::new(toggles));
    let mut handles = Vec::new();
    for _ in 0..toggles {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let user = user.clone();
        let id = p.id.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.likes().toggle_like(&user, &id).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Odd toggle count: the property ends liked. The engine does not
    // deduplicate; flip parity is the contract.
    let record = engine.store().get(&p.id).await.unwrap();
    assert!(record.is_liked_by(&user));
}

#[tokio::test]
async fn available_listing_reflects_lifecycle() {
    let (engine, p) = seeded_engine().await;
    let coordinator = engine.coordinator();

    assert_eq!(engine.store().list_available(&ListingFilter::any()).await.len(), 1);

    coordinator.request_rental(&p.id, &renter("a"), RequestToken::new(1)).await.unwrap();
    coordinator.accept_request(&p.id, &renter("a")).await.unwrap();
    assert!(engine.store().list_available(&ListingFilter::any()).await.is_empty());

    coordinator.release(&p.id).await.unwrap();
    assert_eq!(engine.store().list_available(&ListingFilter::any()).await.len(), 1);
}

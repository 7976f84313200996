//! Scenario builder API.
//!
//! Declarative construction of scenario tests that enforce the Oracle
//! Pattern: `.oracle()` is the only way to obtain something runnable.

use std::{collections::HashMap, sync::Arc, time::Duration};

use haven_authority::RentalEngine;
use haven_client::{CacheConfig, SyncClient};
use haven_core::{
    property::{NewListing, RequestToken, UserId},
    session::Session,
    snapshot::MemorySnapshotStore,
};

use crate::{
    flaky::{Fault, FaultPlan, FlakyAuthority},
    scenario::{OracleFn, World},
    sim_env::SimEnv,
};

#[derive(Debug, Clone)]
struct Listing {
    name: String,
    owner: String,
    location: String,
}

#[derive(Debug, Clone)]
enum Step {
    Request { renter: String, property: String },
    Accept { owner: String, property: String, renter: String },
    Reject { owner: String, property: String, renter: String },
    Release { actor: String, property: String },
    ToggleLike { actor: String, property: String },
    Advance(Duration),
    Inject(Fault),
}

impl Step {
    fn label(&self) -> String {
        match self {
            Self::Request { renter, property } => format!("request({renter}, {property})"),
            Self::Accept { owner, property, renter } => {
                format!("accept({owner}, {property}, {renter})")
            },
            Self::Reject { owner, property, renter } => {
                format!("reject({owner}, {property}, {renter})")
            },
            Self::Release { actor, property } => format!("release({actor}, {property})"),
            Self::ToggleLike { actor, property } => format!("toggle_like({actor}, {property})"),
            Self::Advance(duration) => format!("advance({duration:?})"),
            Self::Inject(fault) => format!("inject({fault:?})"),
        }
    }
}

/// Scenario builder.
///
/// Declare actors, listings, and steps, then call `.oracle()` to get a
/// runnable scenario. Step errors do not abort the run; they are
/// recorded in the world so oracles can assert on them.
pub struct Scenario {
    name: String,
    actors: Vec<String>,
    listings: Vec<Listing>,
    steps: Vec<Step>,
    fault_plan: FaultPlan,
}

impl Scenario {
    /// Create a new scenario with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actors: Vec::new(),
            listings: Vec::new(),
            steps: Vec::new(),
            fault_plan: FaultPlan::reliable(),
        }
    }

    /// Add an actor; each actor gets its own signed-in client.
    #[must_use]
    pub fn actor(mut self, name: impl Into<String>) -> Self {
        self.actors.push(name.into());
        self
    }

    /// Declare a listing owned by `owner`, ingested before any step.
    #[must_use]
    pub fn listing(
        mut self,
        name: impl Into<String>,
        owner: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.listings.push(Listing {
            name: name.into(),
            owner: owner.into(),
            location: location.into(),
        });
        self
    }

    /// Replace the default reliable fault plan.
    #[must_use]
    pub fn fault_plan(mut self, plan: FaultPlan) -> Self {
        self.fault_plan = plan;
        self
    }

    /// Step: `renter` submits a rental request.
    ///
    /// The same (renter, property) pair always reuses one token, so a
    /// repeated request step is an idempotent retry of the first.
    #[must_use]
    pub fn request(mut self, renter: impl Into<String>, property: impl Into<String>) -> Self {
        self.steps.push(Step::Request { renter: renter.into(), property: property.into() });
        self
    }

    /// Step: `owner` accepts `renter`'s pending request.
    #[must_use]
    pub fn accept(
        mut self,
        owner: impl Into<String>,
        property: impl Into<String>,
        renter: impl Into<String>,
    ) -> Self {
        self.steps.push(Step::Accept {
            owner: owner.into(),
            property: property.into(),
            renter: renter.into(),
        });
        self
    }

    /// Step: `owner` rejects `renter`'s pending request.
    #[must_use]
    pub fn reject(
        mut self,
        owner: impl Into<String>,
        property: impl Into<String>,
        renter: impl Into<String>,
    ) -> Self {
        self.steps.push(Step::Reject {
            owner: owner.into(),
            property: property.into(),
            renter: renter.into(),
        });
        self
    }

    /// Step: `actor` releases the property back to available.
    #[must_use]
    pub fn release(mut self, actor: impl Into<String>, property: impl Into<String>) -> Self {
        self.steps.push(Step::Release { actor: actor.into(), property: property.into() });
        self
    }

    /// Step: `actor` flips their like on the property.
    #[must_use]
    pub fn toggle_like(mut self, actor: impl Into<String>, property: impl Into<String>) -> Self {
        self.steps.push(Step::ToggleLike { actor: actor.into(), property: property.into() });
        self
    }

    /// Step: advance the virtual clock.
    #[must_use]
    pub fn advance(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Advance(duration));
        self
    }

    /// Step: queue a fault for the next authority call.
    #[must_use]
    pub fn inject(mut self, fault: Fault) -> Self {
        self.steps.push(Step::Inject(fault));
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory; a scenario cannot run without
    /// verification.
    #[must_use]
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario on a fresh single-threaded runtime.
    ///
    /// Ingests the listings, runs the steps in order, snapshots the
    /// final authoritative records, and invokes the oracle.
    ///
    /// # Errors
    /// Scenario-construction mistakes (unknown actor or property
    /// names) and oracle failures. Step-level engine errors are
    /// recorded in the world instead, so oracles can assert on them.
    pub fn run(self) -> Result<(), String> {
        let name = self.scenario.name.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("scenario '{name}': runtime: {e}"))?;

        let world = runtime.block_on(self.execute())?;
        (self.oracle)(&world)?;
        Ok(())
    }

    async fn execute(&self) -> Result<World, String> {
        let scenario = &self.scenario;
        let env = SimEnv::new();
        let engine = RentalEngine::new(env.clone());
        let authority =
            Arc::new(FlakyAuthority::new(engine.clone(), scenario.fault_plan.clone()));
        let mut world = World::new(env.clone(), Arc::clone(&authority));

        for actor in &scenario.actors {
            let session = Session::new(
                UserId::new(actor.clone()),
                format!("{actor}@scenario.test"),
                actor.clone(),
            );
            let client = SyncClient::new(
                session,
                env.clone(),
                Arc::clone(&authority),
                Arc::new(MemorySnapshotStore::new()),
                CacheConfig::default(),
            );
            world.add_client(actor.clone(), client);
        }

        for listing in &scenario.listings {
            if !scenario.actors.contains(&listing.owner) {
                return Err(format!(
                    "scenario '{}': listing '{}' owned by unknown actor '{}'",
                    scenario.name, listing.name, listing.owner
                ));
            }
            let owner = Session::new(
                UserId::new(listing.owner.clone()),
                format!("{}@scenario.test", listing.owner),
                listing.owner.clone(),
            );
            let property = engine
                .ingest(
                    NewListing {
                        title: listing.name.clone(),
                        description: String::new(),
                        price: 100_000,
                        location: listing.location.clone(),
                        thumbnail: None,
                        pictures: Vec::new(),
                    },
                    &owner,
                )
                .await;
            world.add_property(listing.name.clone(), property.id);
        }

        let mut tokens: HashMap<(String, String), RequestToken> = HashMap::new();
        let mut next_token = 1_u64;

        for (index, step) in scenario.steps.iter().enumerate() {
            let label = step.label();
            let result = match step {
                Step::Request { renter, property } => {
                    let client = self.client(&world, renter)?;
                    let id = self.property_id(&world, property)?;
                    let token = *tokens
                        .entry((renter.clone(), property.clone()))
                        .or_insert_with(|| {
                            let token = RequestToken::new(next_token);
                            next_token += 1;
                            token
                        });
                    client.request_rental(&id, token).await.map(|_| ())
                },
                Step::Accept { owner, property, renter } => {
                    let client = self.client(&world, owner)?;
                    let id = self.property_id(&world, property)?;
                    client.accept_request(&id, &UserId::new(renter.clone())).await.map(|_| ())
                },
                Step::Reject { owner, property, renter } => {
                    let client = self.client(&world, owner)?;
                    let id = self.property_id(&world, property)?;
                    client.reject_request(&id, &UserId::new(renter.clone())).await.map(|_| ())
                },
                Step::Release { actor, property } => {
                    let client = self.client(&world, actor)?;
                    let id = self.property_id(&world, property)?;
                    client.release(&id).await.map(|_| ())
                },
                Step::ToggleLike { actor, property } => {
                    let client = self.client(&world, actor)?;
                    let id = self.property_id(&world, property)?;
                    client.toggle_like(&id).await.map(|_| ())
                },
                Step::Advance(duration) => {
                    env.advance(*duration);
                    Ok(())
                },
                Step::Inject(fault) => {
                    authority.inject(*fault);
                    Ok(())
                },
            };

            if let Err(err) = result {
                world.record_step_failure(index, label, err);
            }
        }

        for listing in &scenario.listings {
            if let Some(id) = world.property_id(&listing.name).cloned() {
                let property = engine.store().get(&id).await.map_err(|e| {
                    format!("scenario '{}': final snapshot of '{}': {e}", scenario.name, listing.name)
                })?;
                world.record_final_property(listing.name.clone(), property);
            }
        }

        Ok(world)
    }

    fn client<'w>(
        &self,
        world: &'w World,
        actor: &str,
    ) -> Result<&'w crate::scenario::SimClient, String> {
        world
            .client(actor)
            .ok_or_else(|| format!("scenario '{}': unknown actor '{actor}'", self.scenario.name))
    }

    fn property_id(
        &self,
        world: &World,
        property: &str,
    ) -> Result<haven_core::property::PropertyId, String> {
        world.property_id(property).cloned().ok_or_else(|| {
            format!("scenario '{}': unknown property '{property}'", self.scenario.name)
        })
    }
}

//! World state for scenario execution.
//!
//! Holds the engine, the fault-injecting authority in front of it, one
//! client per actor, and the final property snapshots oracles inspect
//! after the steps finish.

use std::{collections::HashMap, sync::Arc};

use haven_authority::RentalEngine;
use haven_client::SyncClient;
use haven_core::{
    error::SyncError,
    property::{Property, PropertyId},
};

use crate::{flaky::FlakyAuthority, sim_env::SimEnv};

/// The authority stack scenarios run against.
pub type SimAuthority = FlakyAuthority<RentalEngine<SimEnv>>;

/// The client type scenarios hand to each actor.
pub type SimClient = SyncClient<SimEnv, SimAuthority>;

/// World state containing all actors and final property snapshots.
pub struct World {
    env: SimEnv,
    authority: Arc<SimAuthority>,
    clients: HashMap<String, SimClient>,
    properties: HashMap<String, PropertyId>,
    step_failures: Vec<(usize, String, SyncError)>,
    final_properties: HashMap<String, Property>,
}

impl World {
    pub(crate) fn new(env: SimEnv, authority: Arc<SimAuthority>) -> Self {
        Self {
            env,
            authority,
            clients: HashMap::new(),
            properties: HashMap::new(),
            step_failures: Vec::new(),
            final_properties: HashMap::new(),
        }
    }

    pub(crate) fn add_client(&mut self, name: String, client: SimClient) {
        self.clients.insert(name, client);
    }

    pub(crate) fn add_property(&mut self, name: String, id: PropertyId) {
        self.properties.insert(name, id);
    }

    pub(crate) fn record_step_failure(&mut self, step: usize, label: String, err: SyncError) {
        self.step_failures.push((step, label, err));
    }

    pub(crate) fn record_final_property(&mut self, name: String, property: Property) {
        self.final_properties.insert(name, property);
    }

    /// The virtual-time environment driving the scenario.
    #[must_use]
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The fault-injecting authority all clients talk to.
    #[must_use]
    pub fn authority(&self) -> &Arc<SimAuthority> {
        &self.authority
    }

    /// An actor's client by name.
    #[must_use]
    pub fn client(&self, name: &str) -> Option<&SimClient> {
        self.clients.get(name)
    }

    /// The id assigned to a logical property name.
    #[must_use]
    pub fn property_id(&self, name: &str) -> Option<&PropertyId> {
        self.properties.get(name)
    }

    /// Final authoritative record of a property, by logical name.
    #[must_use]
    pub fn final_property(&self, name: &str) -> Option<&Property> {
        self.final_properties.get(name)
    }

    /// Final records of every declared property.
    #[must_use]
    pub fn final_properties(&self) -> &HashMap<String, Property> {
        &self.final_properties
    }

    /// Steps that returned an error, with step index and label.
    #[must_use]
    pub fn step_failures(&self) -> &[(usize, String, SyncError)] {
        &self.step_failures
    }
}

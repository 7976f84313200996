//! Deterministic test harness for the Haven rental engine.
//!
//! Provides a virtual-time environment, a fault-injecting authority
//! wrapper, a reference model for model-based tests, and a scenario
//! framework with mandatory oracle verification.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod flaky;
pub mod model;
pub mod scenario;
pub mod sim_env;

pub use flaky::{Fault, FaultPlan, FlakyAuthority};
pub use model::{ModelWorld, Operation, OperationResult};
pub use scenario::{OracleFn, RunnableScenario, Scenario, SimAuthority, SimClient, World};
pub use sim_env::SimEnv;

//! Scenario framework with mandatory oracle verification.
//!
//! A scenario declares its actors, listings, and steps up front, then
//! runs them against a real engine under virtual time and fault
//! injection. Construction forces the Oracle Pattern: only
//! `.oracle(..)` yields a runnable scenario, so every scenario test
//! ends with an explicit global-consistency check.

mod builder;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::{SimAuthority, SimClient, World};

/// Oracle verifying global consistency of a finished scenario.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

/// Ready-made oracles for common postconditions.
pub mod oracle {
    use super::{OracleFn, World};

    /// Every property in the world satisfies the state invariants.
    #[must_use]
    pub fn all_invariants_hold() -> OracleFn {
        Box::new(|world: &World| {
            for (name, property) in world.final_properties() {
                property
                    .check_invariants()
                    .map_err(|violation| format!("property '{name}': {violation}"))?;
            }
            Ok(())
        })
    }

    /// No step reported an error.
    #[must_use]
    pub fn no_step_failures() -> OracleFn {
        Box::new(|world: &World| {
            let failures = world.step_failures();
            if failures.is_empty() {
                Ok(())
            } else {
                Err(failures
                    .iter()
                    .map(|(step, label, err)| format!("step {step} ({label}): {err}"))
                    .collect::<Vec<_>>()
                    .join("; "))
            }
        })
    }

    /// The named property ended rented to the named user.
    #[must_use]
    pub fn rented_by(property: &str, user: &str) -> OracleFn {
        let property = property.to_string();
        let user = user.to_string();
        Box::new(move |world: &World| {
            let record = world
                .final_property(&property)
                .ok_or_else(|| format!("property '{property}' not in world"))?;
            let tenant = record.active_tenant_id.as_ref().map(ToString::to_string);
            if tenant.as_deref() == Some(user.as_str()) {
                Ok(())
            } else {
                Err(format!("property '{property}' rented by {tenant:?}, expected '{user}'"))
            }
        })
    }

    /// All of the given oracles pass.
    #[must_use]
    pub fn all_of(oracles: Vec<OracleFn>) -> OracleFn {
        Box::new(move |world: &World| {
            for oracle in &oracles {
                oracle(world)?;
            }
            Ok(())
        })
    }
}

//! Built-in behaviors for Embody.
//!
//! Behaviors turn a Head command into environment calls:
//! flee from the nearest hostile, eat whatever food is carried, wander to a
//! random point, or stay put.
//!
//! Flee and Explore only start motion. The release is handed to the
//! context's motion scheduler, so the receiver can take the next command
//! while the agent is still walking.

pub mod eat;
pub mod explore;
pub mod flee;
pub mod idle;

use embody_config::BehaviorConfig;
use embody_core::behavior::BehaviorRegistry;

pub use eat::EatBehavior;
pub use explore::ExploreBehavior;
pub use flee::FleeBehavior;
pub use idle::IdleBehavior;

/// Create a registry with every built-in behavior.
pub fn default_registry(config: &BehaviorConfig) -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry.register(Box::new(FleeBehavior::new(config)));
    registry.register(Box::new(EatBehavior::new(config)));
    registry.register(Box::new(ExploreBehavior::new(config)));
    registry.register(Box::new(IdleBehavior));
    registry
}

//! Environment trait — the capability surface of the world the Body lives in.
//!
//! An implementation wraps whatever actually hosts the agent (a game client,
//! a simulator, a robot driver). The runtime only reads state and asserts
//! controls through this trait; it never reaches into the connection itself.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::EnvironmentError;
use crate::world::{AgentState, Control, Entity, EquipSlot, Item, Vec3, Vitals};

/// Lifecycle notifications from the environment connection.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentEvent {
    /// The agent's entity exists and can be observed
    Spawned,
    /// Someone (possibly the agent itself) said something
    Chat { username: String, message: String },
    /// The host removed the agent
    Kicked { reason: String },
    /// A non-fatal connection error
    Error { message: String },
    /// The connection is gone for good
    Disconnected,
}

/// The core Environment trait.
///
/// Reads are cheap snapshots. Control assertions are fire-and-forget.
/// Inventory operations may suspend and may be rejected.
#[async_trait]
pub trait Environment: Send + Sync {
    /// The agent's own player name.
    fn username(&self) -> &str;

    /// The agent's entity, or `None` before it has spawned.
    fn agent(&self) -> Option<AgentState>;

    /// Current health and food.
    fn vitals(&self) -> Vitals;

    /// Every entity the environment is tracking, the agent's own included.
    fn entities(&self) -> Vec<Entity>;

    /// Current inventory stacks.
    fn inventory(&self) -> Vec<Item>;

    /// Turn the agent to face a point.
    fn look_at(&self, target: Vec3);

    /// Assert or release a movement control.
    fn set_control(&self, control: Control, active: bool);

    /// Say something in chat.
    fn chat(&self, message: &str);

    /// Move an item into a slot.
    async fn equip(&self, item: &Item, slot: EquipSlot) -> Result<(), EnvironmentError>;

    /// Use whatever is held (eat, drink, place...).
    async fn activate_item(&self) -> Result<(), EnvironmentError>;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<EnvironmentEvent>;

    /// The positioned entity nearest to the agent that satisfies `predicate`.
    ///
    /// The agent itself is never returned.
    fn nearest_entity(&self, predicate: &dyn Fn(&Entity) -> bool) -> Option<Entity> {
        let agent = self.agent()?;
        self.entities()
            .into_iter()
            .filter(|e| e.id != agent.id && predicate(e))
            .filter_map(|e| {
                let distance = agent.position.distance_to(&e.position?);
                Some((distance, e))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostility::is_hostile_entity;
    use crate::sim::SimWorld;

    #[test]
    fn nearest_entity_skips_self_and_unpositioned() {
        let world = SimWorld::new("Prometheus");
        world.spawn_at(Vec3::new(0.0, 64.0, 0.0));
        world.add_unpositioned("zombie");
        let far = world.add_entity("skeleton", Vec3::new(20.0, 64.0, 0.0));
        world.add_entity("cow", Vec3::new(1.0, 64.0, 0.0));

        let nearest = world.nearest_entity(&is_hostile_entity).unwrap();
        assert_eq!(nearest.id, far);

        let any = world.nearest_entity(&|_| true).unwrap();
        assert_eq!(any.label(), "cow");
    }

    #[test]
    fn nearest_entity_before_spawn_is_none() {
        let world = SimWorld::new("Prometheus");
        world.add_entity("zombie", Vec3::new(1.0, 0.0, 0.0));
        assert!(world.nearest_entity(&|_| true).is_none());
    }
}

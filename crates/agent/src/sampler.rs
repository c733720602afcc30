//! Percept sampler — snapshots the environment on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use embody_config::PerceptionConfig;
use embody_core::environment::Environment;
use embody_core::hostility::is_hostile_entity;
use embody_core::percept::{BodyMessage, GroundState, NearbyEntity, Percept};
use embody_core::transport::PerceptPublisher;
use embody_core::world::{AgentState, Entity, round_tenth};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

/// Entities within `radius` of the agent, nearest first, at most `max`.
///
/// The agent itself and entities without a position are skipped. The
/// radius test uses the exact distance; ordering uses the rounded one.
pub fn nearby_entities(
    agent: &AgentState,
    entities: &[Entity],
    radius: f64,
    max: usize,
) -> Vec<NearbyEntity> {
    let mut nearby: Vec<NearbyEntity> = entities
        .iter()
        .filter(|e| e.id != agent.id)
        .filter_map(|e| {
            let distance = agent.position.distance_to(&e.position?);
            (distance <= radius).then(|| NearbyEntity {
                name: e.label().to_string(),
                distance: round_tenth(distance),
                hostile: is_hostile_entity(e),
            })
        })
        .collect();

    // Stable: equal distances keep enumeration order
    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby.truncate(max);
    nearby
}

/// Build a percept from the current environment state.
///
/// Returns `None` until the agent has spawned.
pub fn sample(env: &dyn Environment, config: &PerceptionConfig) -> Option<Percept> {
    let agent = env.agent()?;
    let vitals = env.vitals();
    Some(Percept {
        health: vitals.health,
        food: vitals.food,
        position: agent.position.rounded(),
        nearby_entities: nearby_entities(
            &agent,
            &env.entities(),
            config.radius,
            config.max_entities,
        ),
        ground: GroundState::from_contact(agent.on_ground),
    })
}

/// Periodically samples the environment and publishes each percept.
pub struct PerceptSampler {
    env: Arc<dyn Environment>,
    publisher: Arc<dyn PerceptPublisher>,
    config: PerceptionConfig,
}

impl PerceptSampler {
    pub fn new(
        env: Arc<dyn Environment>,
        publisher: Arc<dyn PerceptPublisher>,
        config: PerceptionConfig,
    ) -> Self {
        Self {
            env,
            publisher,
            config,
        }
    }

    /// Sample once and publish.
    ///
    /// Returns how many subscribers the frame was queued for. Every failure
    /// is swallowed: an unspawned agent, a serialization error, or nobody
    /// listening all yield `None`.
    pub fn tick(&self) -> Option<usize> {
        let percept = sample(self.env.as_ref(), &self.config)?;
        let frame = match BodyMessage::Percept(percept).to_json() {
            Ok(frame) => frame,
            Err(e) => {
                trace!(error = %e, "Percept serialization failed");
                return None;
            }
        };
        match self.publisher.publish(frame) {
            Ok(n) => Some(n),
            Err(e) => {
                trace!(transport = self.publisher.name(), error = %e, "Percept dropped");
                None
            }
        }
    }

    /// Spawn the sampling loop.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_millis(self.config.tick_ms.max(1));
        info!(
            tick_ms = self.config.tick_ms,
            transport = self.publisher.name(),
            "Percept sampler starting"
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.tick();
            }
        })
    }
}

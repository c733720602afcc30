//! Flee — run directly away from the nearest hostile.

use async_trait::async_trait;
use embody_config::BehaviorConfig;
use embody_core::action::{ActionCommand, ActionKind};
use embody_core::behavior::{Behavior, BehaviorContext, BehaviorOutcome};
use embody_core::error::BehaviorError;
use embody_core::hostility::is_hostile_entity;
use embody_core::world::Vec3;
use tracing::info;

pub struct FleeBehavior {
    distance: f64,
    duration_ms: u64,
    eye_height: f64,
}

impl FleeBehavior {
    pub fn new(config: &BehaviorConfig) -> Self {
        Self {
            distance: config.flee_distance,
            duration_ms: config.flee_duration_ms,
            eye_height: config.eye_height,
        }
    }
}

/// A point `distance` away from `agent`, horizontally opposite `threat`.
///
/// When the two share an x/z column the direction is zero and the agent's
/// own position comes back.
pub fn escape_target(agent: Vec3, threat: Vec3, distance: f64) -> Vec3 {
    let dx = agent.x - threat.x;
    let dz = agent.z - threat.z;
    let mut len = (dx * dx + dz * dz).sqrt();
    if len == 0.0 {
        len = 1.0;
    }
    Vec3::new(
        agent.x + dx / len * distance,
        agent.y,
        agent.z + dz / len * distance,
    )
}

#[async_trait]
impl Behavior for FleeBehavior {
    fn kind(&self) -> ActionKind {
        ActionKind::Flee
    }

    fn description(&self) -> &str {
        "Run away from the nearest hostile mob"
    }

    async fn run(
        &self,
        ctx: &BehaviorContext,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        let Some(agent) = ctx.env.agent() else {
            info!("Flee: agent not spawned");
            return Ok(BehaviorOutcome::skipped("not spawned"));
        };

        let threat = ctx
            .env
            .nearest_entity(&is_hostile_entity)
            .and_then(|e| Some((e.label().to_string(), e.position?)));
        let Some((threat_name, threat_pos)) = threat else {
            info!("Flee: no hostile found");
            return Ok(BehaviorOutcome::skipped("no hostile found"));
        };

        let target = escape_target(agent.position, threat_pos, self.distance);
        ctx.env
            .look_at(Vec3::new(target.x, agent.position.y + self.eye_height, target.z));
        let plan = ctx.begin_motion(ActionKind::Flee, target, self.duration_ms);

        info!(
            threat = %threat_name,
            reason = command.reason().unwrap_or("-"),
            target = ?target.rounded(),
            "Fleeing"
        );
        Ok(BehaviorOutcome::Moving {
            target,
            deadline_ms: plan.deadline_ms,
        })
    }
}

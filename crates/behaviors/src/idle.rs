use async_trait::async_trait;
use embody_core::action::{ActionCommand, ActionKind};
use embody_core::behavior::{Behavior, BehaviorContext, BehaviorOutcome};
use embody_core::error::BehaviorError;
use tracing::debug;

/// Does nothing. Motion already in progress keeps running.
pub struct IdleBehavior;

#[async_trait]
impl Behavior for IdleBehavior {
    fn kind(&self) -> ActionKind {
        ActionKind::Idle
    }

    fn description(&self) -> &str {
        "Do nothing"
    }

    async fn run(
        &self,
        _ctx: &BehaviorContext,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        debug!(reason = command.reason().unwrap_or("-"), "Idling");
        Ok(BehaviorOutcome::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_core::clock::ManualClock;
    use embody_core::sim::SimWorld;
    use embody_core::world::Vec3;
    use std::sync::Arc;

    #[tokio::test]
    async fn touches_nothing() {
        let world = Arc::new(SimWorld::new("Prometheus"));
        world.spawn_at(Vec3::new(0.0, 64.0, 0.0));
        world.add_entity("zombie", Vec3::new(2.0, 64.0, 0.0));
        let ctx = BehaviorContext::new(world.clone(), Arc::new(ManualClock::new()));

        let cmd = ActionCommand::decode(r#"{"action":"idle","reason":"no_threat"}"#).unwrap();
        assert_eq!(
            IdleBehavior.run(&ctx, &cmd).await.unwrap(),
            BehaviorOutcome::Idle
        );
        assert!(world.calls().is_empty());
        assert!(ctx.motion.pending().is_empty());
    }
}

//! Action dispatcher — routes a decoded command to its behavior.

use chrono::Utc;
use embody_core::action::ActionCommand;
use embody_core::behavior::{BehaviorContext, BehaviorOutcome, BehaviorRegistry};
use embody_core::error::BehaviorError;
use embody_core::event::BodyEvent;
use tracing::{info, warn};

pub struct ActionDispatcher {
    registry: BehaviorRegistry,
    ctx: BehaviorContext,
}

impl ActionDispatcher {
    pub fn new(registry: BehaviorRegistry, ctx: BehaviorContext) -> Self {
        Self { registry, ctx }
    }

    pub fn context(&self) -> &BehaviorContext {
        &self.ctx
    }

    /// Run the behavior for `command` and report how it ended.
    ///
    /// Unknown actions and behavior failures are logged here; the error is
    /// still returned so callers can observe it, but it is never fatal.
    pub async fn dispatch(
        &self,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        let action = command.action.to_string();
        self.ctx.events.publish(BodyEvent::CommandReceived {
            action: action.clone(),
            reason: command.reason().map(String::from),
            timestamp: Utc::now(),
        });

        let Some(behavior) = self.registry.get(&command.action) else {
            warn!(action = %action, "Unknown action");
            self.ctx.events.publish(BodyEvent::UnknownAction {
                action: action.clone(),
                timestamp: Utc::now(),
            });
            return Err(BehaviorError::NotFound(action));
        };

        let result = behavior.run(&self.ctx, command).await;
        let outcome = match &result {
            Ok(outcome) => {
                info!(action = %action, outcome = %outcome, "Behavior finished");
                outcome.to_string()
            }
            Err(e) => {
                warn!(action = %action, error = %e, "Behavior failed");
                format!("failed: {e}")
            }
        };
        self.ctx.events.publish(BodyEvent::BehaviorFinished {
            behavior: action,
            outcome,
            timestamp: Utc::now(),
        });
        result
    }
}

//! Behavior trait — the abstraction over what the Body can do.
//!
//! Each action the Head may request is backed by one [`Behavior`]. Behaviors
//! are registered in a [`BehaviorRegistry`] keyed by [`ActionKind`] and run
//! against a shared [`BehaviorContext`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::action::{ActionCommand, ActionKind};
use crate::clock::Clock;
use crate::environment::Environment;
use crate::error::BehaviorError;
use crate::event::{BodyEvent, EventBus};
use crate::motion::{MotionPlan, MotionScheduler};
use crate::world::{Control, Vec3};

/// Everything a behavior may touch.
#[derive(Clone)]
pub struct BehaviorContext {
    pub env: Arc<dyn Environment>,
    pub clock: Arc<dyn Clock>,
    pub motion: Arc<MotionScheduler>,
    pub events: Arc<EventBus>,
}

impl BehaviorContext {
    pub fn new(env: Arc<dyn Environment>, clock: Arc<dyn Clock>) -> Self {
        Self {
            env,
            clock,
            motion: Arc::new(MotionScheduler::new()),
            events: Arc::new(EventBus::default()),
        }
    }

    /// Share an existing event bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Assert forward motion and schedule its release `duration_ms` from now.
    pub fn begin_motion(&self, behavior: ActionKind, target: Vec3, duration_ms: u64) -> MotionPlan {
        self.env.set_control(Control::Forward, true);
        let plan = MotionPlan {
            behavior,
            target,
            deadline_ms: self.clock.now_ms().saturating_add(duration_ms),
        };
        self.motion.schedule(plan.clone());
        plan
    }

    /// Release forward motion once for every plan whose deadline has passed.
    ///
    /// Releases apply regardless of which behavior asserted motion since.
    pub fn release_due(&self) -> Vec<MotionPlan> {
        let due = self.motion.take_due(self.clock.now_ms());
        for plan in &due {
            self.env.set_control(Control::Forward, false);
            debug!(behavior = %plan.behavior, deadline_ms = plan.deadline_ms, "Forward motion released");
            self.events.publish(BodyEvent::MotionReleased {
                behavior: plan.behavior.to_string(),
                deadline_ms: plan.deadline_ms,
                timestamp: Utc::now(),
            });
        }
        due
    }
}

/// How a behavior run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorOutcome {
    /// Forward motion asserted toward `target`, released at `deadline_ms`
    Moving { target: Vec3, deadline_ms: u64 },
    /// An item was eaten
    Consumed { item: String },
    /// Nothing to act on; not an error
    Skipped { reason: String },
    /// Intentionally did nothing
    Idle,
}

impl BehaviorOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for BehaviorOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moving { .. } => f.write_str("moving"),
            Self::Consumed { item } => write!(f, "consumed {item}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Idle => f.write_str("idle"),
        }
    }
}

/// The core Behavior trait.
#[async_trait]
pub trait Behavior: Send + Sync {
    /// The action tag this behavior answers to.
    fn kind(&self) -> ActionKind;

    /// One-line summary for logs and `--help` style listings.
    fn description(&self) -> &str;

    /// Run once for `command`.
    ///
    /// Must not wait for timed motion to finish; schedule it through
    /// [`BehaviorContext::begin_motion`] and return.
    async fn run(
        &self,
        ctx: &BehaviorContext,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError>;
}

/// A registry of available behaviors.
pub struct BehaviorRegistry {
    behaviors: HashMap<ActionKind, Box<dyn Behavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Register a behavior. Replaces any existing one for the same action.
    pub fn register(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.insert(behavior.kind(), behavior);
    }

    pub fn get(&self, kind: &ActionKind) -> Option<&dyn Behavior> {
        self.behaviors.get(kind).map(|b| b.as_ref())
    }

    /// Run the behavior registered for the command's action.
    pub async fn dispatch(
        &self,
        ctx: &BehaviorContext,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        let behavior = self
            .get(&command.action)
            .ok_or_else(|| BehaviorError::NotFound(command.action.to_string()))?;
        behavior.run(ctx, command).await
    }

    /// Registered action tags, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.behaviors.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Domain event system — observable milestones of the perception-action loop.
//!
//! Events are published when something interesting happens in the Body.
//! Observers (logging sinks, tests, diagnostics) subscribe without coupling
//! to the loop itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the Body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyEvent {
    /// The agent spawned and the sampler started
    Spawned { timestamp: DateTime<Utc> },

    /// A command was decoded and is about to be dispatched
    CommandReceived {
        action: String,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// An inbound message could not be decoded
    InvalidCommand {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A decoded command named no registered behavior
    UnknownAction {
        action: String,
        timestamp: DateTime<Utc>,
    },

    /// A behavior reached its terminal state
    BehaviorFinished {
        behavior: String,
        outcome: String,
        timestamp: DateTime<Utc>,
    },

    /// A scheduled motion window elapsed and forward motion was released
    MotionReleased {
        behavior: String,
        deadline_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The environment removed the agent
    Kicked {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The environment connection closed
    Disconnected { timestamp: DateTime<Utc> },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<BodyEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: BodyEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BodyEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

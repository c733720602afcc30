//! Command receiver — the single consumption loop over inbound frames.

use std::sync::Arc;

use chrono::Utc;
use embody_core::action::ActionCommand;
use embody_core::error::TransportError;
use embody_core::event::BodyEvent;
use embody_core::transport::InboundFrame;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatcher::ActionDispatcher;

/// Counters for one receiver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames decoded and dispatched (known or not)
    pub dispatched: u64,
    /// Frames that failed to decode
    pub invalid: u64,
    /// In-band transport errors
    pub transport_errors: u64,
}

pub struct CommandReceiver {
    dispatcher: Arc<ActionDispatcher>,
}

impl CommandReceiver {
    pub fn new(dispatcher: Arc<ActionDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Decode and dispatch one frame. Returns `false` if it was discarded.
    pub async fn handle(&self, frame: &InboundFrame) -> bool {
        debug!(origin = %frame.origin, payload = %frame.payload, "<< command");

        let command = match ActionCommand::decode(&frame.payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(origin = %frame.origin, error = %e, "Invalid command");
                self.dispatcher
                    .context()
                    .events
                    .publish(BodyEvent::InvalidCommand {
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                return false;
            }
        };

        // Outcome and failures are already logged by the dispatcher
        let _ = self.dispatcher.dispatch(&command).await;
        true
    }

    /// Process frames strictly in arrival order until the source closes.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<Result<InboundFrame, TransportError>>,
    ) -> ReceiverStats {
        let mut stats = ReceiverStats::default();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(frame) => {
                    if self.handle(&frame).await {
                        stats.dispatched += 1;
                    } else {
                        stats.invalid += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Command transport error");
                    stats.transport_errors += 1;
                }
            }
        }
        info!(
            dispatched = stats.dispatched,
            invalid = stats.invalid,
            "Command source closed, receiver stopping"
        );
        stats
    }
}

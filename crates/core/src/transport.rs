//! Transport traits — the abstraction over the Head link.
//!
//! Two one-way pipes connect the Body to the Head:
//! - a [`PerceptPublisher`] that broadcasts percept frames, best-effort;
//! - a [`CommandSource`] that yields inbound command frames in arrival order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// A raw inbound message, not yet decoded.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    /// Where it came from (peer address, `"memory"`...)
    pub origin: String,
    /// The serialized command
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

impl InboundFrame {
    pub fn new(origin: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}

/// Outbound broadcast sink.
///
/// `publish` must never block: implementations queue the frame for each
/// subscriber and return immediately. Frames are allowed to be dropped.
pub trait PerceptPublisher: Send + Sync {
    /// Human-readable transport name (e.g. "tcp", "memory").
    fn name(&self) -> &str;

    /// Queue a frame for every current subscriber.
    ///
    /// Returns how many subscribers it was queued for, or
    /// [`TransportError::NoSubscribers`] when nobody is listening.
    fn publish(&self, frame: String) -> Result<usize, TransportError>;

    /// Number of currently attached subscribers.
    fn subscriber_count(&self) -> usize;
}

/// Ordered inbound message source.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Start accepting commands.
    ///
    /// Returns a receiver that yields frames in arrival order. Transient
    /// errors are delivered in-band; the receiver closes when the source stops.
    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundFrame, TransportError>>, TransportError>;

    /// Stop accepting commands.
    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

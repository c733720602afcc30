//! In-process transports.
//!
//! [`BroadcastPublisher`] is the fan-out hub the TCP publisher is built on;
//! used directly it lets an embedding application consume percepts without
//! a socket. [`QueueSource`] is a command source fed through
//! [`QueueSource::inject`].

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use embody_core::error::TransportError;
use embody_core::transport::{CommandSource, InboundFrame, PerceptPublisher};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

/// Bounded fan-out of percept frames.
///
/// Drop policy: each subscriber sees at most `capacity` unread frames. When
/// a subscriber falls further behind, its oldest frames are overwritten and
/// its next `recv` reports how many it lost. Publishing never waits.
pub struct BroadcastPublisher {
    sender: broadcast::Sender<Arc<str>>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a new subscriber. It only sees frames published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PerceptPublisher for BroadcastPublisher {
    fn name(&self) -> &str {
        "memory"
    }

    fn publish(&self, frame: String) -> Result<usize, TransportError> {
        self.sender
            .send(Arc::from(frame))
            .map_err(|_| TransportError::NoSubscribers)
    }

    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A command source fed from inside the process.
pub struct QueueSource {
    capacity: usize,
    inject_tx: Mutex<Option<mpsc::Sender<Result<InboundFrame, TransportError>>>>,
}

impl QueueSource {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inject_tx: Mutex::new(None),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Result<InboundFrame, TransportError>>> {
        self.inject_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue a raw payload as if it came off the wire.
    pub async fn inject(&self, payload: impl Into<String>) -> Result<(), TransportError> {
        let tx = self
            .sender()
            .ok_or_else(|| TransportError::Closed("queue source not started".into()))?;
        tx.send(Ok(InboundFrame::new("memory", payload)))
            .await
            .map_err(|_| TransportError::Closed("receiver dropped".into()))
    }
}

impl Default for QueueSource {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl CommandSource for QueueSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundFrame, TransportError>>, TransportError> {
        info!(capacity = self.capacity, "Memory command queue starting");
        let (tx, rx) = mpsc::channel(self.capacity);
        *self.inject_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        // Dropping the last sender closes the receiver
        self.inject_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

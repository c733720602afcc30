//! TCP transports — newline-delimited JSON.
//!
//! Both endpoints are bound by the Body:
//! - [`TcpPublisher`] accepts any number of subscribers and writes every
//!   published frame to each of them as one line. Each subscriber is served
//!   by its own task reading from a bounded [`BroadcastPublisher`] queue, so
//!   a stalled reader only loses its own oldest frames.
//! - [`TcpCommandSource`] accepts any number of pushers and forwards every
//!   non-empty line as an [`InboundFrame`]. Lines that are not UTF-8 or
//!   exceed the line cap are reported in-band and the connection stays up.
//!
//! [`PerceptSubscriber`] and [`send_command`] are the Head-side counterparts.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use embody_core::action::ActionCommand;
use embody_core::error::TransportError;
use embody_core::transport::{CommandSource, InboundFrame, PerceptPublisher};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::memory::BroadcastPublisher;

async fn bind(endpoint: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(endpoint)
        .await
        .map_err(|e| TransportError::Bind {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
}

// ── Publisher ───────────────────────────────────────────────────────────────

/// Percept broadcast over TCP.
pub struct TcpPublisher {
    hub: Arc<BroadcastPublisher>,
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl TcpPublisher {
    /// Bind the broadcast endpoint and start accepting subscribers.
    ///
    /// `capacity` is the per-subscriber backlog before frames are dropped.
    pub async fn bind(endpoint: &str, capacity: usize) -> Result<Self, TransportError> {
        let listener = bind(endpoint).await?;
        let local_addr = listener.local_addr()?;
        let hub = Arc::new(BroadcastPublisher::new(capacity));
        info!(endpoint = %local_addr, "Percept publisher bound");

        let accept_hub = hub.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "Percept subscriber connected");
                        let rx = accept_hub.subscribe();
                        tokio::spawn(serve_subscriber(stream, peer, rx));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept percept subscriber"),
                }
            }
        });

        Ok(Self {
            hub,
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn serve_subscriber(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<Arc<str>>,
) {
    loop {
        match rx.recv().await {
            Ok(frame) => {
                let mut line = String::with_capacity(frame.len() + 1);
                line.push_str(&frame);
                line.push('\n');
                if let Err(e) = stream.write_all(line.as_bytes()).await {
                    debug!(peer = %peer, error = %e, "Percept subscriber went away");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(peer = %peer, skipped, "Percept subscriber lagging, dropped frames");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl PerceptPublisher for TcpPublisher {
    fn name(&self) -> &str {
        "tcp"
    }

    fn publish(&self, frame: String) -> Result<usize, TransportError> {
        self.hub.publish(frame)
    }

    fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

// ── Command source ──────────────────────────────────────────────────────────

/// Command pull endpoint over TCP.
pub struct TcpCommandSource {
    local_addr: SocketAddr,
    capacity: usize,
    max_line_bytes: usize,
    listener: Mutex<Option<TcpListener>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

/// Default cap on a single inbound command line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

impl TcpCommandSource {
    /// Bind the pull endpoint. Connections are accepted once started.
    pub async fn bind(endpoint: &str, capacity: usize) -> Result<Self, TransportError> {
        let listener = bind(endpoint).await?;
        let local_addr = listener.local_addr()?;
        info!(endpoint = %local_addr, "Command endpoint bound");
        Ok(Self {
            local_addr,
            capacity: capacity.max(1),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            listener: Mutex::new(Some(listener)),
            accept_task: Mutex::new(None),
        })
    }

    /// Lines longer than `bytes` are reported invalid and skipped.
    pub fn with_max_line_bytes(mut self, bytes: usize) -> Self {
        self.max_line_bytes = bytes.max(1);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// One newline-terminated chunk from a pusher.
#[derive(Debug, PartialEq)]
enum RawLine {
    Line(Vec<u8>),
    /// Exceeded the cap; the bytes were discarded up to the newline.
    Oversized(usize),
}

/// Read up to the next `\n` without buffering more than `max` bytes.
///
/// A trailing line without a newline is returned at EOF.
async fn read_line_capped<R>(reader: &mut R, max: usize) -> std::io::Result<Option<RawLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut seen = 0usize;
    loop {
        let (done, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(match seen {
                    0 => None,
                    n if n > max => Some(RawLine::Oversized(n)),
                    _ => Some(RawLine::Line(buf)),
                });
            }
            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], true),
                None => (available, false),
            };
            seen += chunk.len();
            if seen <= max {
                buf.extend_from_slice(chunk);
            } else {
                buf.clear();
            }
            (done, chunk.len() + usize::from(done))
        };
        reader.consume(used);
        if done {
            return Ok(Some(if seen > max {
                RawLine::Oversized(seen)
            } else {
                RawLine::Line(buf)
            }));
        }
    }
}

async fn read_commands(
    stream: TcpStream,
    peer: SocketAddr,
    max_line_bytes: usize,
    tx: mpsc::Sender<Result<InboundFrame, TransportError>>,
) {
    let origin = peer.to_string();
    let mut reader = BufReader::new(stream);
    loop {
        let frame = match read_line_capped(&mut reader, max_line_bytes).await {
            Ok(Some(RawLine::Line(bytes))) => match String::from_utf8(bytes) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    Ok(InboundFrame::new(origin.as_str(), line))
                }
                Err(e) => Err(TransportError::InvalidPayload(format!(
                    "from {origin}: not utf-8 ({e})"
                ))),
            },
            Ok(Some(RawLine::Oversized(len))) => Err(TransportError::InvalidPayload(format!(
                "from {origin}: {len} byte line exceeds {max_line_bytes}"
            ))),
            Ok(None) => {
                debug!(peer = %peer, "Command pusher disconnected");
                return;
            }
            Err(e) => {
                let _ = tx.send(Err(TransportError::Io(e))).await;
                return;
            }
        };
        if tx.send(frame).await.is_err() {
            return; // Receiver loop gone
        }
    }
}

#[async_trait]
impl CommandSource for TcpCommandSource {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundFrame, TransportError>>, TransportError> {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| TransportError::Closed("command source already started".into()))?;

        let (tx, rx) = mpsc::channel(self.capacity);
        let max_line_bytes = self.max_line_bytes;
        // Dropping the set aborts every reader and its sender.
        let task = tokio::spawn(async move {
            let mut readers = JoinSet::new();
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "Command pusher connected");
                            readers.spawn(read_commands(stream, peer, max_line_bytes, tx.clone()));
                        }
                        Err(e) => warn!(error = %e, "Failed to accept command pusher"),
                    },
                    Some(_) = readers.join_next(), if !readers.is_empty() => {}
                }
            }
        });
        *self.accept_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        info!(endpoint = %self.local_addr, "Command endpoint accepting");
        Ok(rx)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }
}

// ── Head-side clients ───────────────────────────────────────────────────────

/// Push a single command to a Body's pull endpoint.
pub async fn send_command(endpoint: &str, command: &ActionCommand) -> Result<(), TransportError> {
    let payload = command
        .encode()
        .map_err(|e| TransportError::InvalidPayload(e.to_string()))?;
    let mut stream = TcpStream::connect(endpoint).await?;
    stream.write_all(payload.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}

/// A connection to a Body's percept endpoint.
pub struct PerceptSubscriber {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl PerceptSubscriber {
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(endpoint).await?;
        let (read, _write) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read).lines(),
        })
    }

    /// The next raw frame, or `None` once the Body closes the connection.
    pub async fn next_frame(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.lines.next_line().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_core::action::ActionKind;
    use std::time::Duration;

    async fn wait_for_subscribers(publisher: &TcpPublisher, n: usize) {
        for _ in 0..200 {
            if publisher.subscriber_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscribers never attached");
    }

    #[tokio::test]
    async fn publisher_fans_out_lines() {
        let publisher = TcpPublisher::bind("127.0.0.1:0", 8).await.unwrap();
        let addr = publisher.local_addr().to_string();

        let mut a = PerceptSubscriber::connect(&addr).await.unwrap();
        let mut b = PerceptSubscriber::connect(&addr).await.unwrap();
        wait_for_subscribers(&publisher, 2).await;

        publisher.publish(r#"{"type":"percept"}"#.into()).unwrap();
        assert_eq!(
            a.next_frame().await.unwrap().as_deref(),
            Some(r#"{"type":"percept"}"#)
        );
        assert_eq!(
            b.next_frame().await.unwrap().as_deref(),
            Some(r#"{"type":"percept"}"#)
        );
    }

    #[tokio::test]
    async fn publish_with_nobody_listening_is_reported() {
        let publisher = TcpPublisher::bind("127.0.0.1:0", 8).await.unwrap();
        assert!(matches!(
            publisher.publish("x".into()),
            Err(TransportError::NoSubscribers)
        ));
    }

    #[tokio::test]
    async fn bind_conflict_is_a_bind_error() {
        let first = TcpPublisher::bind("127.0.0.1:0", 8).await.unwrap();
        let taken = first.local_addr().to_string();
        let err = TcpCommandSource::bind(&taken, 8).await.err().unwrap();
        assert!(matches!(err, TransportError::Bind { .. }));
    }

    #[tokio::test]
    async fn commands_arrive_in_order() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8).await.unwrap();
        let addr = source.local_addr().to_string();
        let mut rx = source.start().await.unwrap();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream
            .write_all(b"{\"action\":\"flee\"}\n\n{not json\n{\"action\":\"idle\"}\n")
            .await
            .unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.payload, r#"{"action":"flee"}"#);
        assert_eq!(rx.recv().await.unwrap().unwrap().payload, "{not json");
        assert_eq!(
            rx.recv().await.unwrap().unwrap().payload,
            r#"{"action":"idle"}"#
        );
    }

    #[tokio::test]
    async fn bad_utf8_line_keeps_connection() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8).await.unwrap();
        let addr = source.local_addr().to_string();
        let mut rx = source.start().await.unwrap();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream
            .write_all(b"\xff\xfe\n{\"action\":\"idle\"}\n")
            .await
            .unwrap();

        let bad = rx.recv().await.unwrap();
        assert!(matches!(bad, Err(TransportError::InvalidPayload(_))));
        let good = rx.recv().await.unwrap().unwrap();
        assert_eq!(good.payload, r#"{"action":"idle"}"#);
    }

    #[tokio::test]
    async fn oversized_line_is_skipped_to_next_newline() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8)
            .await
            .unwrap()
            .with_max_line_bytes(32);
        let addr = source.local_addr().to_string();
        let mut rx = source.start().await.unwrap();

        let mut payload = vec![b'x'; 4096];
        payload.extend_from_slice(b"\n{\"action\":\"eat\"}\n");
        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(&payload).await.unwrap();

        let Err(TransportError::InvalidPayload(reason)) = rx.recv().await.unwrap() else {
            panic!("expected an invalid payload");
        };
        assert!(reason.contains("4096"), "{reason}");
        assert_eq!(
            rx.recv().await.unwrap().unwrap().payload,
            r#"{"action":"eat"}"#
        );
    }

    #[tokio::test]
    async fn capped_reads_across_small_buffers() {
        let data: &[u8] = b"abc\nabcdefgh\r\n\nlast";
        let mut reader = BufReader::with_capacity(3, data);

        let mut lines = Vec::new();
        while let Some(line) = read_line_capped(&mut reader, 6).await.unwrap() {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec![
                RawLine::Line(b"abc".to_vec()),
                RawLine::Oversized(9),
                RawLine::Line(Vec::new()),
                RawLine::Line(b"last".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn stop_closes_the_receiver_with_pushers_connected() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8).await.unwrap();
        let addr = source.local_addr().to_string();
        let mut rx = source.start().await.unwrap();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(b"{\"action\":\"idle\"}\n").await.unwrap();
        assert!(rx.recv().await.unwrap().is_ok());

        source.stop().await.unwrap();
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(closed, Ok(None)));
        drop(stream);
    }

    #[tokio::test]
    async fn send_command_round_trips() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8).await.unwrap();
        let addr = source.local_addr().to_string();
        let mut rx = source.start().await.unwrap();

        let cmd = ActionCommand::new(ActionKind::Explore).with_param("reason", "bored");
        send_command(&addr, &cmd).await.unwrap();

        let frame = rx.recv().await.unwrap().unwrap();
        let decoded = ActionCommand::decode(&frame.payload).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[tokio::test]
    async fn second_start_fails() {
        let source = TcpCommandSource::bind("127.0.0.1:0", 8).await.unwrap();
        let _rx = source.start().await.unwrap();
        assert!(source.start().await.is_err());
        source.stop().await.unwrap();
    }
}

//! Chat Connection
//!
//! One accepted socket's bookkeeping (owning user, joined rooms, bounded
//! outbox) and the two workers that move frames across it.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval_at, timeout, timeout_at, Instant};
use uuid::Uuid;

use super::dispatch::dispatch_frame;
use super::hub::Hub;
use crate::config::WebSocketSettings;
use crate::domain::ChatUsecase;

/// Opaque connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a connection's outbox was closed. Carried into the close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    IdleTimeout,
    Superseded,
    SlowConsumer,
    InvalidPayload,
    PolicyViolation,
    InternalError,
}

impl CloseReason {
    pub fn code(&self) -> u16 {
        match self {
            Self::Normal | Self::IdleTimeout | Self::Superseded => 1000,
            Self::InvalidPayload => 1007,
            Self::SlowConsumer | Self::PolicyViolation => 1008,
            Self::InternalError => 1011,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::IdleTimeout => "idle timeout",
            Self::Superseded => "session superseded",
            Self::SlowConsumer => "outbound queue overflow",
            Self::InvalidPayload => "missing token",
            Self::PolicyViolation => "invalid token",
            Self::InternalError => "internal error",
        }
    }

    pub fn close_frame(&self) -> CloseFrame {
        CloseFrame {
            code: self.code(),
            reason: Utf8Bytes::from_static(self.reason()),
        }
    }
}

/// Per-connection delivery failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbox full")]
    Full,

    #[error("outbox closed")]
    Closed,
}

/// Receiving half of an [`Outbox`], drained by the writer.
pub type OutboxReceiver = mpsc::Receiver<Utf8Bytes>;

#[derive(Debug)]
struct OutboxState {
    sender: Option<mpsc::Sender<Utf8Bytes>>,
    close_reason: Option<CloseReason>,
}

/// Bounded queue of encoded frames waiting for the writer.
///
/// The only sender lives here, so closing the outbox is what ends the
/// writer's receive loop.
#[derive(Debug)]
pub struct Outbox {
    state: Mutex<OutboxState>,
}

impl Outbox {
    pub fn channel(capacity: usize) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let outbox = Self {
            state: Mutex::new(OutboxState {
                sender: Some(tx),
                close_reason: None,
            }),
        };
        (outbox, rx)
    }

    /// Queue a frame without waiting.
    pub fn try_push(&self, frame: Utf8Bytes) -> Result<(), DeliveryError> {
        let state = self.state.lock();
        let sender = state.sender.as_ref().ok_or(DeliveryError::Closed)?;
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Close the outbox. Returns true only for the call that closed it;
    /// the first reason wins.
    pub fn close(&self, reason: CloseReason) -> bool {
        let mut state = self.state.lock();
        if state.sender.take().is_some() {
            state.close_reason = Some(reason);
            true
        } else {
            false
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.state.lock().close_reason
    }
}

/// One live chat connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: String,
    outbox: Outbox,
    joined_rooms: RwLock<HashSet<String>>,
}

impl Connection {
    pub fn new(
        user_id: impl Into<String>,
        rooms: impl IntoIterator<Item = String>,
        outbox_capacity: usize,
    ) -> (Arc<Self>, OutboxReceiver) {
        let (outbox, rx) = Outbox::channel(outbox_capacity);
        let connection = Self {
            id: ConnectionId::new(),
            user_id: user_id.into(),
            outbox,
            joined_rooms: RwLock::new(rooms.into_iter().collect()),
        };
        (Arc::new(connection), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Add a room. Returns false if already joined.
    pub fn join(&self, room_id: &str) -> bool {
        self.joined_rooms.write().insert(room_id.to_string())
    }

    /// Remove a room. Returns false if it was not joined.
    pub fn leave(&self, room_id: &str) -> bool {
        self.joined_rooms.write().remove(room_id)
    }

    pub fn is_in_room(&self, room_id: &str) -> bool {
        self.joined_rooms.read().contains(room_id)
    }

    /// Joined rooms, sorted.
    pub fn joined_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.joined_rooms.read().iter().cloned().collect();
        rooms.sort();
        rooms
    }
}

/// Why the reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Peer sent a close frame
    Closed,
    /// Stream ended without a close frame
    StreamEnded,
    /// Receive failed
    TransportError,
    /// Nothing decodable arrived before the read deadline
    IdleTimeout,
    /// The writer stopped first
    WriterExited,
    /// A panic was caught at the read boundary
    Panicked,
}

impl ReadOutcome {
    /// Close frame reason to use during teardown.
    pub fn close_reason(&self) -> CloseReason {
        match self {
            Self::IdleTimeout => CloseReason::IdleTimeout,
            Self::Panicked => CloseReason::InternalError,
            _ => CloseReason::Normal,
        }
    }
}

/// Why the writer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Outbox closed; a close frame was attempted
    Closed(CloseReason),
    /// A send failed or missed its deadline
    TransportError,
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("write deadline exceeded")]
    Timeout,

    #[error("transport: {0}")]
    Transport(String),
}

async fn send_with_deadline<S, E>(
    sink: &mut S,
    message: Message,
    deadline: Duration,
) -> Result<(), WriteError>
where
    S: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    match timeout(deadline, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Transport(e.to_string())),
        Err(_) => Err(WriteError::Timeout),
    }
}

/// Writer worker: drains the outbox onto the socket and sends keepalive
/// pings. A closed outbox produces a close frame and ends the loop.
pub async fn write_loop<S, E>(
    mut sink: S,
    mut outbox_rx: OutboxReceiver,
    connection: Arc<Connection>,
    settings: WebSocketSettings,
) -> WriteOutcome
where
    S: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    let write_timeout = settings.write_timeout();
    let ping_interval = settings.ping_interval();
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            frame = outbox_rx.recv() => match frame {
                Some(text) => {
                    if let Err(e) = send_with_deadline(&mut sink, Message::Text(text), write_timeout).await {
                        tracing::debug!(
                            connection_id = %connection.id(),
                            error = %e,
                            "Write failed"
                        );
                        return WriteOutcome::TransportError;
                    }
                }
                None => {
                    let reason = connection.outbox().close_reason().unwrap_or(CloseReason::Normal);
                    let close = Message::Close(Some(reason.close_frame()));
                    if let Err(e) = send_with_deadline(&mut sink, close, write_timeout).await {
                        tracing::trace!(
                            connection_id = %connection.id(),
                            error = %e,
                            "Close frame not delivered"
                        );
                    }
                    let _ = timeout(write_timeout, sink.close()).await;
                    tracing::debug!(
                        connection_id = %connection.id(),
                        code = reason.code(),
                        "Writer closed"
                    );
                    return WriteOutcome::Closed(reason);
                }
            },

            _ = ping.tick() => {
                if let Err(e) = send_with_deadline(&mut sink, Message::Ping(Bytes::new()), write_timeout).await {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Keepalive ping failed"
                    );
                    return WriteOutcome::TransportError;
                }
            }
        }
    }
}

/// Reader worker: decodes and dispatches frames until the peer goes away,
/// the transport fails, or the rolling read deadline passes.
pub async fn read_loop<St, E>(
    mut stream: St,
    connection: &Arc<Connection>,
    hub: &Hub,
    chat: &dyn ChatUsecase,
    read_timeout: Duration,
) -> ReadOutcome
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + read_timeout;

    loop {
        let next = match timeout_at(deadline, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::info!(
                    connection_id = %connection.id(),
                    user_id = %connection.user_id(),
                    "Read deadline exceeded, closing connection"
                );
                return ReadOutcome::IdleTimeout;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                let outcome = dispatch_frame(connection, hub, chat, text.as_str()).await;
                if outcome.is_decoded() {
                    deadline = Instant::now() + read_timeout;
                }
            }
            Some(Ok(Message::Pong(_))) => {
                deadline = Instant::now() + read_timeout;
            }
            Some(Ok(Message::Ping(_))) => {
                // Pong is handled automatically by axum
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    "Binary frame ignored"
                );
                crate::infrastructure::metrics::record_frame_rejected("binary");
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    code = frame.as_ref().map(|f| f.code),
                    "Peer closed connection"
                );
                return ReadOutcome::Closed;
            }
            Some(Err(e)) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    "WebSocket error"
                );
                return ReadOutcome::TransportError;
            }
            None => return ReadOutcome::StreamEnded,
        }
    }
}

//! Inbound frame dispatch
//!
//! Turns one decoded frame into persistence calls and hub fan-outs. Nothing
//! here is fatal to the connection: bad input and collaborator failures are
//! logged and reported through [`DispatchOutcome`].

use std::sync::Arc;

use super::connection::Connection;
use super::hub::{BroadcastReport, Hub};
use super::messages::{decode_frame, FrameError, InboundFrame, MessageKind, WireMessage};
use crate::domain::{ChatUsecase, MessageType};
use crate::infrastructure::metrics;

/// Why a frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Malformed,
    UnknownType,
    MissingRoom,
    MissingContent,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnknownType => "unknown_type",
            Self::MissingRoom => "missing_room",
            Self::MissingContent => "missing_content",
        }
    }
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Fanned out through the hub
    Broadcast(BroadcastReport),
    /// Answered on the sender's own outbox
    Replied,
    /// Keepalive acknowledgement, nothing to do
    Acknowledged,
    Joined(String),
    Left(String),
    /// Dropped before any side effect
    Rejected(RejectReason),
    /// The chat use case refused or failed to store the message
    PersistFailed,
}

impl DispatchOutcome {
    /// Whether the frame parsed as a JSON envelope. Drives the read deadline.
    pub fn is_decoded(&self) -> bool {
        !matches!(self, Self::Rejected(RejectReason::Malformed))
    }
}

/// Handle one text frame received on `connection`.
pub async fn dispatch_frame(
    connection: &Arc<Connection>,
    hub: &Hub,
    chat: &dyn ChatUsecase,
    text: &str,
) -> DispatchOutcome {
    let frame = match decode_frame(text) {
        Ok(frame) => frame,
        Err(FrameError::Malformed(e)) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Malformed frame dropped"
            );
            return reject(RejectReason::Malformed);
        }
        Err(FrameError::UnknownType(kind)) => {
            tracing::debug!(
                connection_id = %connection.id(),
                kind = %kind,
                "Unknown message type dropped"
            );
            return reject(RejectReason::UnknownType);
        }
    };

    metrics::record_frame_received(frame.kind.as_str());

    match frame.kind {
        MessageKind::Message => handle_chat_message(connection, hub, chat, frame).await,
        MessageKind::Typing => {
            if frame.room_id.is_empty() {
                return reject(RejectReason::MissingRoom);
            }
            let outgoing = WireMessage::stamped(
                MessageKind::Typing,
                frame.room_id.as_str(),
                connection.user_id(),
                frame.content,
                frame.data,
            );
            DispatchOutcome::Broadcast(hub.broadcast_room(&frame.room_id, &outgoing))
        }
        MessageKind::Ping => {
            let pong = WireMessage::pong(frame.room_id);
            if let Err(e) = hub.send_to_connection(connection, &pong) {
                tracing::debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    "Pong not queued"
                );
            }
            DispatchOutcome::Replied
        }
        MessageKind::Pong => DispatchOutcome::Acknowledged,
        MessageKind::UserStatus => {
            let outgoing = WireMessage::stamped(
                MessageKind::UserStatus,
                frame.room_id,
                connection.user_id(),
                frame.content,
                frame.data,
            );
            DispatchOutcome::Broadcast(hub.broadcast_all(&outgoing))
        }
        MessageKind::JoinRoom => {
            if frame.room_id.is_empty() {
                return reject(RejectReason::MissingRoom);
            }
            hub.join_room(connection, &frame.room_id);
            tracing::debug!(
                connection_id = %connection.id(),
                room_id = %frame.room_id,
                "Joined room"
            );
            DispatchOutcome::Joined(frame.room_id)
        }
        MessageKind::LeaveRoom => {
            if frame.room_id.is_empty() {
                return reject(RejectReason::MissingRoom);
            }
            hub.leave_room(connection, &frame.room_id);
            tracing::debug!(
                connection_id = %connection.id(),
                room_id = %frame.room_id,
                "Left room"
            );
            DispatchOutcome::Left(frame.room_id)
        }
    }
}

async fn handle_chat_message(
    connection: &Arc<Connection>,
    hub: &Hub,
    chat: &dyn ChatUsecase,
    frame: InboundFrame,
) -> DispatchOutcome {
    if frame.room_id.is_empty() {
        return reject(RejectReason::MissingRoom);
    }
    if frame.content.is_empty() {
        return reject(RejectReason::MissingContent);
    }

    let stored = match chat
        .send_message(
            &frame.room_id,
            connection.user_id(),
            MessageType::Text,
            &frame.content,
        )
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                room_id = %frame.room_id,
                error = %e,
                "Failed to store message"
            );
            metrics::record_frame_rejected("persist_failed");
            return DispatchOutcome::PersistFailed;
        }
    };

    // Sending into a room subscribes the sender to it.
    if hub.join_room(connection, &frame.room_id) {
        tracing::debug!(
            connection_id = %connection.id(),
            room_id = %frame.room_id,
            "Joined room on first send"
        );
    }

    let outgoing = WireMessage {
        kind: MessageKind::Message,
        room_id: frame.room_id,
        sender_id: connection.user_id().to_string(),
        content: frame.content,
        data: frame.data,
        created_at: Some(stored.created_at),
    };
    DispatchOutcome::Broadcast(hub.broadcast_room(&outgoing.room_id, &outgoing))
}

fn reject(reason: RejectReason) -> DispatchOutcome {
    metrics::record_frame_rejected(reason.as_str());
    DispatchOutcome::Rejected(reason)
}

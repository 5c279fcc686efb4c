//! Chat WebSocket Hub
//!
//! Real-time chat over WebSocket: wire protocol, per-connection workers,
//! the connection registry, and the accept path.

pub mod connection;
pub mod dispatch;
pub mod handler;
pub mod hub;
pub mod messages;

pub use connection::{
    CloseReason, Connection, ConnectionId, DeliveryError, Outbox, OutboxReceiver, ReadOutcome,
    WriteOutcome,
};
pub use dispatch::{dispatch_frame, DispatchOutcome, RejectReason};
pub use handler::{ws_handler, ConnectionContext};
pub use hub::{BroadcastReport, Hub};
pub use messages::{decode_frame, FrameError, InboundFrame, MessageKind, WireMessage};

//! Chat Hub
//!
//! Process-wide registry of live connections and the broadcast router.
//!
//! Every registry read and write goes through one mutex. Fan-out pushes into
//! bounded outboxes without waiting, so the lock is never held across an
//! await point and a slow peer can only cost itself its connection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;

use super::connection::{CloseReason, Connection, ConnectionId, DeliveryError};
use super::messages::WireMessage;
use crate::infrastructure::metrics;

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Targets whose outbox accepted the frame
    pub delivered: usize,
    /// Targets removed because their outbox was full
    pub evicted: Vec<ConnectionId>,
    /// Targets already shutting down
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Arc<Connection>>,
    by_user: HashMap<String, ConnectionId>,
}

impl Registry {
    /// Remove a connection and close its outbox. Safe to call twice.
    fn remove(&mut self, id: ConnectionId, reason: CloseReason) -> Option<Arc<Connection>> {
        let connection = self.connections.remove(&id)?;
        if self.by_user.get(connection.user_id()) == Some(&id) {
            self.by_user.remove(connection.user_id());
        }
        connection.outbox().close(reason);
        Some(connection)
    }

    fn evict(&mut self, id: ConnectionId) {
        if let Some(connection) = self.remove(id, CloseReason::SlowConsumer) {
            metrics::record_eviction("slow_consumer");
            tracing::warn!(
                connection_id = %id,
                user_id = %connection.user_id(),
                "Outbox full, connection evicted"
            );
        }
    }
}

/// Registry and broadcast router for all chat connections
#[derive(Debug, Default)]
pub struct Hub {
    registry: Mutex<Registry>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection as its user's active session.
    ///
    /// One session per user: a previous connection for the same user is
    /// removed and closed as superseded. Returns its id.
    pub fn register(&self, connection: Arc<Connection>) -> Option<ConnectionId> {
        let id = connection.id();
        let user_id = connection.user_id().to_string();

        let mut registry = self.registry.lock();
        let superseded = registry
            .by_user
            .get(&user_id)
            .copied()
            .filter(|previous| *previous != id);

        if let Some(previous) = superseded {
            registry.remove(previous, CloseReason::Superseded);
            metrics::record_eviction("superseded");
            tracing::info!(
                user_id = %user_id,
                connection_id = %previous,
                replaced_by = %id,
                "Session superseded"
            );
        }

        registry.connections.insert(id, connection);
        registry.by_user.insert(user_id.clone(), id);
        metrics::set_active_connections(registry.connections.len());

        tracing::info!(
            user_id = %user_id,
            connection_id = %id,
            "Connection registered"
        );

        superseded
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut registry = self.registry.lock();
        let removed = registry.remove(id, CloseReason::Normal);
        metrics::set_active_connections(registry.connections.len());

        if let Some(connection) = &removed {
            tracing::info!(
                user_id = %connection.user_id(),
                connection_id = %id,
                "Connection unregistered"
            );
        }
        removed.is_some()
    }

    /// Send to every registered connection.
    pub fn broadcast_all(&self, message: &WireMessage) -> BroadcastReport {
        metrics::record_broadcast("all");
        self.fan_out(message, |_| true)
    }

    /// Send to every connection that has joined `room_id`.
    pub fn broadcast_room(&self, room_id: &str, message: &WireMessage) -> BroadcastReport {
        metrics::record_broadcast("room");
        self.fan_out(message, |connection| connection.is_in_room(room_id))
    }

    /// Queue a frame on one connection, evicting it if its outbox is full.
    pub fn send_to_connection(
        &self,
        connection: &Connection,
        message: &WireMessage,
    ) -> Result<(), DeliveryError> {
        let frame = encode(message).ok_or(DeliveryError::Closed)?;
        let mut registry = self.registry.lock();
        let result = connection.outbox().try_push(frame);
        if result == Err(DeliveryError::Full) {
            if registry.connections.contains_key(&connection.id()) {
                registry.evict(connection.id());
            } else {
                connection.outbox().close(CloseReason::SlowConsumer);
            }
        }
        result
    }

    /// Subscribe a connection to a room. Returns false if already joined.
    ///
    /// Membership changes hold the registry lock, same as room fan-out.
    pub fn join_room(&self, connection: &Connection, room_id: &str) -> bool {
        let _registry = self.registry.lock();
        connection.join(room_id)
    }

    /// Unsubscribe a connection from a room. Returns false if it was not joined.
    pub fn leave_room(&self, connection: &Connection, room_id: &str) -> bool {
        let _registry = self.registry.lock();
        connection.leave(room_id)
    }

    pub fn connection_for_user(&self, user_id: &str) -> Option<Arc<Connection>> {
        let registry = self.registry.lock();
        registry
            .by_user
            .get(user_id)
            .and_then(|id| registry.connections.get(id))
            .cloned()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.registry.lock().connections.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.lock().connections.len()
    }

    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.registry.lock().by_user.contains_key(user_id)
    }

    fn fan_out<F>(&self, message: &WireMessage, filter: F) -> BroadcastReport
    where
        F: Fn(&Connection) -> bool,
    {
        let mut report = BroadcastReport::default();
        let Some(frame) = encode(message) else {
            return report;
        };

        let mut registry = self.registry.lock();
        for (id, connection) in &registry.connections {
            if !filter(connection.as_ref()) {
                continue;
            }
            match connection.outbox().try_push(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Full) => report.evicted.push(*id),
                Err(DeliveryError::Closed) => report.skipped += 1,
            }
        }
        for id in &report.evicted {
            registry.evict(*id);
        }
        if !report.evicted.is_empty() {
            metrics::set_active_connections(registry.connections.len());
        }

        tracing::trace!(
            kind = %message.kind,
            room_id = %message.room_id,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast complete"
        );
        report
    }
}

fn encode(message: &WireMessage) -> Option<Utf8Bytes> {
    match message.encode() {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(kind = %message.kind, error = %e, "Failed to serialize message");
            None
        }
    }
}

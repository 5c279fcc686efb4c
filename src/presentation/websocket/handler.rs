//! WebSocket Connection Handler
//!
//! The accept path: token check, connection construction, registration,
//! worker startup, and teardown.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{FutureExt, SinkExt, StreamExt};
use serde::Deserialize;

use super::connection::{read_loop, write_loop, CloseReason, Connection, ReadOutcome};
use super::hub::Hub;
use crate::config::WebSocketSettings;
use crate::domain::{AuthClient, AuthError, ChatUsecase};
use crate::startup::AppState;

/// Upgrade request query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Everything a connection needs once it is authenticated
#[derive(Clone)]
pub struct ConnectionContext {
    pub hub: Arc<Hub>,
    pub chat: Arc<dyn ChatUsecase>,
    pub settings: WebSocketSettings,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let max_message_size = state.settings.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, params.token, state))
}

/// Authenticate an upgraded socket and run it to completion.
async fn handle_socket(socket: WebSocket, token: Option<String>, state: AppState) {
    let user_id = match authenticate(state.auth.as_ref(), token.as_deref()).await {
        Ok(user_id) => user_id,
        Err(reason) => {
            reject(socket, reason).await;
            return;
        }
    };

    let rooms = match state.chat.find_rooms_by_user_id(&user_id).await {
        Ok(rooms) => rooms,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to load rooms, starting with none"
            );
            Vec::new()
        }
    };

    let ctx = ConnectionContext {
        hub: state.hub.clone(),
        chat: state.chat.clone(),
        settings: state.settings.websocket.clone(),
    };
    run_connection(socket, user_id, rooms, ctx).await;
}

/// Verify the upgrade token. The error is the close reason to reject with.
pub async fn authenticate(
    auth: &dyn AuthClient,
    token: Option<&str>,
) -> Result<String, CloseReason> {
    let token = match token {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::debug!("Upgrade without token rejected");
            return Err(CloseReason::InvalidPayload);
        }
    };

    match auth.verify_token(token).await {
        Ok(user) => Ok(user.user_id),
        Err(AuthError::Unavailable(e)) => {
            tracing::error!(error = %e, "Auth service unavailable");
            Err(CloseReason::PolicyViolation)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Invalid token");
            Err(CloseReason::PolicyViolation)
        }
    }
}

/// Close a socket that never made it into the hub.
async fn reject(mut socket: WebSocket, reason: CloseReason) {
    if let Err(e) = socket.send(Message::Close(Some(reason.close_frame()))).await {
        tracing::debug!(error = %e, "Failed to send rejection close frame");
    }
}

/// Register an authenticated socket, run both workers, and tear down when
/// either stops.
pub async fn run_connection(
    socket: WebSocket,
    user_id: String,
    rooms: Vec<String>,
    ctx: ConnectionContext,
) {
    let (sink, stream) = socket.split();
    let (connection, outbox_rx) = Connection::new(user_id, rooms, ctx.settings.outbox_capacity);

    ctx.hub.register(connection.clone());

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = %connection.id(),
        rooms = connection.joined_rooms().len(),
        "User connected"
    );

    let mut writer = tokio::spawn(write_loop(
        sink,
        outbox_rx,
        connection.clone(),
        ctx.settings.clone(),
    ));
    let mut writer_done = false;

    let reader = guard_panics(read_loop(
        stream,
        &connection,
        &ctx.hub,
        ctx.chat.as_ref(),
        ctx.settings.read_timeout(),
    ));

    let outcome = tokio::select! {
        outcome = reader => outcome,
        _ = &mut writer => {
            writer_done = true;
            ReadOutcome::WriterExited
        }
    };

    // Teardown: the first close reason wins, so set it before unregistering.
    connection.outbox().close(outcome.close_reason());
    ctx.hub.unregister(connection.id());

    if !writer_done {
        match tokio::time::timeout(ctx.settings.close_grace(), &mut writer).await {
            Ok(Err(e)) if e.is_panic() => {
                tracing::error!(connection_id = %connection.id(), "Writer panicked");
            }
            Ok(_) => {}
            Err(_) => writer.abort(),
        }
    }

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = %connection.id(),
        outcome = ?outcome,
        "User disconnected"
    );
}

/// Convert a panic inside the read path into an ordinary outcome.
pub async fn guard_panics<F>(reader: F) -> ReadOutcome
where
    F: Future<Output = ReadOutcome>,
{
    match AssertUnwindSafe(reader).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(panic = %message, "Panic in read path, closing connection");
            ReadOutcome::Panicked
        }
    }
}

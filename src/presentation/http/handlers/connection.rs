//! Connection lookup handler
//!
//! Lets other backend services ask whether a user currently holds a chat
//! session and which rooms it is subscribed to.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::shared::error::AppError;
use crate::startup::AppState;

/// Longest user id accepted on the path
const MAX_USER_ID_LENGTH: usize = 128;

/// Active session summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub user_id: String,
    pub connection_id: String,
    pub rooms: Vec<String>,
}

/// GET /api/v1/connections/{user_id}
pub async fn get_user_connection(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ConnectionResponse>, AppError> {
    if user_id.trim().is_empty() || user_id.len() > MAX_USER_ID_LENGTH {
        return Err(AppError::BadRequest("Invalid user id".into()));
    }

    let connection = state
        .hub
        .connection_for_user(&user_id)
        .ok_or_else(|| AppError::NotFound("User is not connected".into()))?;

    Ok(Json(ConnectionResponse {
        user_id: connection.user_id().to_string(),
        connection_id: connection.id().to_string(),
        rooms: connection.joined_rooms(),
    }))
}

//! Authenticated session identity and the token verification contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub user_id: String,
}

/// Token verification errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}

/// Verifies access tokens presented on the chat upgrade request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<VerifiedUser, AuthError>;
}

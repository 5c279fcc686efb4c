//! Token verification implementations.

pub mod jwt_auth_client;

pub use jwt_auth_client::{Claims, JwtAuthClient};

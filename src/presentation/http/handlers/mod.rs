//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod connection;
pub mod health;

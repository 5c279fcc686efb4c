//! Infrastructure Layer
//!
//! Contains implementations for external collaborators:
//! - Token verification (JWT)
//! - Chat persistence (in-memory repository)
//! - Prometheus metrics

pub mod auth;
pub mod metrics;
pub mod repositories;

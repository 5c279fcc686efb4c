//! # Domain Layer
//!
//! Contracts between the chat hub and the rest of the social backend.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits define what the hub consumes (token verification,
//!   message persistence, room membership)
//! - Implementations are injected at startup

pub mod entities;

pub use entities::*;

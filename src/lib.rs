//! # Social Hub Library
//!
//! The real-time chat connection hub of a social-network backend:
//! - WebSocket endpoint authenticated by an access token
//! - Per-connection reader/writer workers over a bounded outbox
//! - A process-wide hub that fans messages out to everyone or to a room
//!
//! ## Architecture
//!
//! - **Domain Layer**: collaborator contracts (token verification, chat persistence)
//! - **Infrastructure Layer**: JWT verification, in-memory chat repository, metrics
//! - **Presentation Layer**: HTTP routes and the WebSocket hub
//!
//! ## Module Structure
//!
//! ```text
//! social_hub/
//! +-- config/         Configuration management
//! +-- domain/         Collaborator traits and entities
//! +-- infrastructure/ Auth, repositories, metrics
//! +-- presentation/   HTTP routes and WebSocket hub
//! +-- shared/         Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Collaborator contracts
pub mod domain;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;

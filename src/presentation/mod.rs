//! Presentation Layer
//!
//! HTTP routes and the chat WebSocket hub.

pub mod http;
pub mod middleware;
pub mod websocket;

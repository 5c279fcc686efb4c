//! Repository Implementations
//!
//! Implementations of the domain collaborator traits.
//!
//! ## Available Repositories
//!
//! - **InMemoryChatRepository** - Rooms, memberships and stored messages
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use social_hub::infrastructure::repositories::InMemoryChatRepository;
//!
//! let chat = Arc::new(InMemoryChatRepository::new());
//! chat.add_member("general", "user-1");
//! ```

pub mod chat_repository;

pub use chat_repository::InMemoryChatRepository;

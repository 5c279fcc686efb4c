//! # Domain Entities
//!
//! The entities and collaborator contracts the chat hub depends on.
//!
//! - **Message**: a stored chat message and the [`ChatUsecase`] that persists it
//! - **Session**: the identity behind a verified token and the [`AuthClient`]
//!   that produces it
//!
//! Both traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod message;
mod session;

pub use message::{ChatError, ChatUsecase, MessageType, StoredMessage};
pub use session::{AuthClient, AuthError, VerifiedUser};

#[cfg(test)]
pub use message::MockChatUsecase;
#[cfg(test)]
pub use session::MockAuthClient;

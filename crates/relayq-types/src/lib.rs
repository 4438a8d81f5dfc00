//! RelayQ Types - Core domain types for the message broker
//!
//! This crate contains the broker entities (queues, exchanges, bindings,
//! messages), the closed error taxonomy, and the request validation rules
//! shared across RelayQ components.

pub mod error;
pub mod exchange;
pub mod message;
pub mod queue;
pub mod validation;

// Re-export commonly used types
pub use error::{Error, FieldError, Result};
pub use exchange::{Binding, Exchange};
pub use message::Message;
pub use queue::{Durability, Queue, DEAD_LETTER_QUEUE_NAME};

//! RelayQ Storage - Repository layer for the message broker
//!
//! Repositories are the sole owners of entity lifetime: the only place
//! queues and exchanges are created, listed, replaced or destroyed.
//! Entities are tracked as single shared instances, so every holder of a
//! `get` result observes subsequent mutation through the same instance.
//!
//! Currently supports:
//! - In-memory repositories (default; all state is lost on restart)

pub mod traits;

#[cfg(feature = "memory")]
pub mod memory;

// Re-exports
pub use traits::{ExchangeRepository, QueueRepository};

#[cfg(feature = "memory")]
pub use memory::{InMemoryExchangeRepository, InMemoryQueueRepository};

//! Repository trait definitions
//!
//! The repository lock guards the name -> entity map structure only and is
//! always released before the resolved entity is handed to the caller, so
//! there is no ordering hazard with the entity-level locks.

use std::sync::Arc;

use relayq_types::{Binding, Exchange, Queue, Result};
use uuid::Uuid;

/// Name-keyed collection of queues
pub trait QueueRepository: Send + Sync {
    /// Insert or replace the tracked instance under its name
    fn store(&self, queue: Arc<Queue>);

    /// Resolve the shared instance, `QueueNotFound` if absent
    fn get(&self, name: &str) -> Result<Arc<Queue>>;

    /// All tracked queues, ordered by name ascending
    fn find(&self) -> Vec<Arc<Queue>>;

    /// Remove a queue. `QueueNotFound` if absent, `QueueNonDeletable` for
    /// the reserved system queue.
    fn delete(&self, name: &str) -> Result<()>;
}

/// Name-keyed collection of exchanges
pub trait ExchangeRepository: Send + Sync {
    /// Insert or replace the tracked instance under its name
    fn store(&self, exchange: Arc<Exchange>);

    /// Resolve the shared instance, `ExchangeNotFound` if absent
    fn get(&self, name: &str) -> Result<Arc<Exchange>>;

    /// All tracked exchanges, ordered by name ascending
    fn find(&self) -> Vec<Arc<Exchange>>;

    /// Remove an exchange, `ExchangeNotFound` if absent
    fn delete(&self, name: &str) -> Result<()>;

    /// Resolve the exchange and append a binding to it
    fn add_binding(&self, exchange_name: &str, binding: Binding) -> Result<()>;

    /// Resolve the exchange and remove a binding from it
    fn delete_binding(&self, exchange_name: &str, binding_id: Uuid) -> Result<()>;
}

//! Exchange and binding types
//!
//! An [`Exchange`] is a named collection of bindings; publishing to it fans
//! the message out to every bound queue. Routing keys are accepted, stored
//! and echoed back, but never evaluated: delivery is pure fanout.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A named pointer from an exchange to a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Binding {
    /// Unique binding identifier (within its exchange)
    pub id: Uuid,

    /// Name of the target queue
    pub queue: String,

    /// Stored but inert: does not filter fanout delivery
    #[serde(default)]
    pub routing_key: String,
}

impl Binding {
    pub fn new(queue: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// A named collection of bindings, kept in insertion order.
///
/// The binding sequence is guarded by an internal lock; like queues,
/// exchanges are single shared instances handed out by the repository,
/// never copied.
#[derive(Debug)]
pub struct Exchange {
    name: String,
    bindings: Mutex<Vec<Binding>>,
}

impl Exchange {
    /// Create a new exchange with no bindings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a binding.
    ///
    /// Within one exchange at most one binding may target a given queue
    /// name, regardless of routing key.
    pub fn bind(&self, binding: Binding) -> Result<()> {
        let mut bindings = self.bindings.lock();
        if bindings.iter().any(|b| b.queue == binding.queue) {
            return Err(Error::BindingAlreadyExists(binding.queue));
        }

        bindings.push(binding);
        Ok(())
    }

    /// Remove a binding by id
    pub fn unbind(&self, binding_id: Uuid) -> Result<()> {
        let mut bindings = self.bindings.lock();
        match bindings.iter().position(|b| b.id == binding_id) {
            Some(index) => {
                bindings.remove(index);
                Ok(())
            }
            None => Err(Error::BindingNotFound(binding_id)),
        }
    }

    /// Snapshot of the bindings in insertion order
    pub fn bindings(&self) -> Vec<Binding> {
        self.bindings.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_keeps_insertion_order() {
        let exchange = Exchange::new("app.internal");
        exchange.bind(Binding::new("events", "#")).unwrap();
        exchange.bind(Binding::new("tmp", "#")).unwrap();

        let bindings = exchange.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].queue, "events");
        assert_eq!(bindings[1].queue, "tmp");
    }

    #[test]
    fn test_bind_rejects_duplicate_queue_regardless_of_routing_key() {
        let exchange = Exchange::new("app.internal");
        exchange.bind(Binding::new("events", "#")).unwrap();

        let err = exchange.bind(Binding::new("events", "orders.*")).unwrap_err();
        assert_eq!(err, Error::BindingAlreadyExists("events".into()));
        assert_eq!(err.to_string(), "Binding to Queue 'events' already exists");
        assert_eq!(exchange.bindings().len(), 1);
    }

    #[test]
    fn test_unbind_removes_by_id() {
        let exchange = Exchange::new("app.internal");
        let binding = Binding::new("events", "#");
        let binding_id = binding.id;
        exchange.bind(binding).unwrap();

        exchange.unbind(binding_id).unwrap();
        assert!(exchange.bindings().is_empty());

        assert_eq!(
            exchange.unbind(binding_id),
            Err(Error::BindingNotFound(binding_id))
        );
    }
}

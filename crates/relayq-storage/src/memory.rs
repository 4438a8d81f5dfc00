//! In-memory repositories
//!
//! Fast, non-persistent storage. All queues, exchanges, bindings and
//! messages are lost when the process exits, regardless of a queue's
//! durability marker.

use std::sync::Arc;

use dashmap::DashMap;
use relayq_types::{Binding, Error, Exchange, Queue, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::{ExchangeRepository, QueueRepository};

/// In-memory queue repository
///
/// The map guards structure only; each queue carries its own lock for
/// message operations.
#[derive(Default)]
pub struct InMemoryQueueRepository {
    queues: DashMap<String, Arc<Queue>>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }
}

impl QueueRepository for InMemoryQueueRepository {
    fn store(&self, queue: Arc<Queue>) {
        info!(queue = %queue.name(), "Queue stored");
        self.queues.insert(queue.name().to_string(), queue);
    }

    fn get(&self, name: &str) -> Result<Arc<Queue>> {
        self.queues
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::QueueNotFound(name.to_string()))
    }

    fn find(&self) -> Vec<Arc<Queue>> {
        let mut queues: Vec<Arc<Queue>> = self
            .queues
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        // The backing map has no inherent order; ordering is a repository
        // contract.
        queues.sort_by(|a, b| a.name().cmp(b.name()));
        queues
    }

    fn delete(&self, name: &str) -> Result<()> {
        match self.queues.remove_if(name, |_, queue| !queue.is_system()) {
            Some(_) => {
                info!(queue = %name, "Queue deleted");
                Ok(())
            }
            // Either absent or protected; look again to tell which.
            None => match self.queues.get(name) {
                Some(_) => Err(Error::QueueNonDeletable(name.to_string())),
                None => Err(Error::QueueNotFound(name.to_string())),
            },
        }
    }
}

/// In-memory exchange repository
#[derive(Default)]
pub struct InMemoryExchangeRepository {
    exchanges: DashMap<String, Arc<Exchange>>,
}

impl InMemoryExchangeRepository {
    pub fn new() -> Self {
        Self {
            exchanges: DashMap::new(),
        }
    }
}

impl ExchangeRepository for InMemoryExchangeRepository {
    fn store(&self, exchange: Arc<Exchange>) {
        info!(exchange = %exchange.name(), "Exchange stored");
        self.exchanges.insert(exchange.name().to_string(), exchange);
    }

    fn get(&self, name: &str) -> Result<Arc<Exchange>> {
        self.exchanges
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::ExchangeNotFound(name.to_string()))
    }

    fn find(&self) -> Vec<Arc<Exchange>> {
        let mut exchanges: Vec<Arc<Exchange>> = self
            .exchanges
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        exchanges.sort_by(|a, b| a.name().cmp(b.name()));
        exchanges
    }

    fn delete(&self, name: &str) -> Result<()> {
        match self.exchanges.remove(name) {
            Some(_) => {
                info!(exchange = %name, "Exchange deleted");
                Ok(())
            }
            None => Err(Error::ExchangeNotFound(name.to_string())),
        }
    }

    fn add_binding(&self, exchange_name: &str, binding: Binding) -> Result<()> {
        let exchange = self.get(exchange_name)?;
        debug!(
            exchange = %exchange_name,
            queue = %binding.queue,
            binding_id = %binding.id,
            "Binding added"
        );
        exchange.bind(binding)
    }

    fn delete_binding(&self, exchange_name: &str, binding_id: Uuid) -> Result<()> {
        let exchange = self.get(exchange_name)?;
        debug!(
            exchange = %exchange_name,
            binding_id = %binding_id,
            "Binding deleted"
        );
        exchange.unbind(binding_id)
    }
}

#[cfg(test)]
mod tests {
    use relayq_types::{Durability, Message, DEAD_LETTER_QUEUE_NAME};

    use super::*;

    fn repository_with(names: &[&str]) -> InMemoryQueueRepository {
        let repository = InMemoryQueueRepository::new();
        for name in names {
            repository.store(Arc::new(Queue::new(*name, Durability::Durable)));
        }
        repository
    }

    #[test]
    fn test_get_returns_the_shared_instance() {
        let repository = repository_with(&["events"]);

        // A mutation through one handle is visible through every other.
        let first = repository.get("events").unwrap();
        let second = repository.get("events").unwrap();
        first.enqueue(Message::new("hello"));

        assert_eq!(second.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_get_missing_queue() {
        let repository = repository_with(&[]);
        assert_eq!(
            repository.get("nope").unwrap_err(),
            Error::QueueNotFound("nope".into())
        );
    }

    #[test]
    fn test_find_sorts_by_name_regardless_of_insertion_order() {
        let repository = repository_with(&["tmp", "events", "audit"]);

        let queues = repository.find();
        let names: Vec<&str> = queues.iter().map(|q| q.name()).collect();
        assert_eq!(names, vec!["audit", "events", "tmp"]);
    }

    #[test]
    fn test_store_replaces_the_tracked_instance() {
        let repository = repository_with(&["events"]);
        let original = repository.get("events").unwrap();
        original.enqueue(Message::new("old"));

        repository.store(Arc::new(Queue::new("events", Durability::Transient)));

        let replaced = repository.get("events").unwrap();
        assert!(!Arc::ptr_eq(&original, &replaced));
        assert!(replaced.is_empty());
    }

    #[test]
    fn test_delete_is_not_idempotent() {
        let repository = repository_with(&["events"]);

        repository.delete("events").unwrap();
        assert_eq!(
            repository.delete("events").unwrap_err(),
            Error::QueueNotFound("events".into())
        );
    }

    #[test]
    fn test_system_queue_is_non_deletable() {
        let repository = InMemoryQueueRepository::new();
        repository.store(Arc::new(Queue::system(
            DEAD_LETTER_QUEUE_NAME,
            Durability::Durable,
        )));

        assert_eq!(
            repository.delete(DEAD_LETTER_QUEUE_NAME).unwrap_err(),
            Error::QueueNonDeletable(DEAD_LETTER_QUEUE_NAME.into())
        );
        assert!(repository.get(DEAD_LETTER_QUEUE_NAME).is_ok());
    }

    #[test]
    fn test_exchange_binding_lifecycle() {
        let repository = InMemoryExchangeRepository::new();
        repository.store(Arc::new(Exchange::new("app.internal")));

        let binding = Binding::new("events", "#");
        let binding_id = binding.id;
        repository.add_binding("app.internal", binding).unwrap();

        // Shared instance: the binding is visible without a re-store.
        let exchange = repository.get("app.internal").unwrap();
        assert_eq!(exchange.bindings().len(), 1);

        repository
            .delete_binding("app.internal", binding_id)
            .unwrap();
        assert!(exchange.bindings().is_empty());
    }

    #[test]
    fn test_binding_operations_on_missing_exchange() {
        let repository = InMemoryExchangeRepository::new();

        assert_eq!(
            repository
                .add_binding("nope", Binding::new("events", "#"))
                .unwrap_err(),
            Error::ExchangeNotFound("nope".into())
        );
        assert_eq!(
            repository.delete_binding("nope", Uuid::new_v4()).unwrap_err(),
            Error::ExchangeNotFound("nope".into())
        );
    }

    #[test]
    fn test_exchange_find_sorted() {
        let repository = InMemoryExchangeRepository::new();
        repository.store(Arc::new(Exchange::new("app.internal")));
        repository.store(Arc::new(Exchange::new("app.external")));

        let exchanges = repository.find();
        let names: Vec<&str> = exchanges.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["app.external", "app.internal"]);
    }
}

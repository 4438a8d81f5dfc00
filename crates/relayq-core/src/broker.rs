//! Broker - the orchestrator over both repositories
//!
//! The broker implements every operation the HTTP layer exposes. It is
//! fully synchronous: no operation blocks waiting for messages, and any
//! polling or retry behavior belongs to external consumers.

use std::sync::Arc;

use relayq_storage::{ExchangeRepository, QueueRepository};
use relayq_types::{
    Binding, Durability, Error, Exchange, Message, Queue, Result, DEAD_LETTER_QUEUE_NAME,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Message broker over a queue repository and an exchange repository.
///
/// Creation conflicts are detected here; the repositories themselves only
/// know insert-or-replace semantics.
pub struct Broker {
    queues: Arc<dyn QueueRepository>,
    exchanges: Arc<dyn ExchangeRepository>,
}

impl Broker {
    /// Create a broker over the given repositories.
    ///
    /// Ensures the reserved dead-letter queue exists so nack always has a
    /// target.
    pub fn new(queues: Arc<dyn QueueRepository>, exchanges: Arc<dyn ExchangeRepository>) -> Self {
        if queues.get(DEAD_LETTER_QUEUE_NAME).is_err() {
            queues.store(Arc::new(Queue::system(
                DEAD_LETTER_QUEUE_NAME,
                Durability::Durable,
            )));
        }

        info!("Broker initialized");
        Self { queues, exchanges }
    }

    // ==================== Queue Operations ====================

    /// Create a new queue
    pub fn create_queue(&self, name: &str, durability: Durability) -> Result<Arc<Queue>> {
        if self.queues.get(name).is_ok() {
            return Err(Error::QueueAlreadyExists(name.to_string()));
        }

        let queue = Arc::new(Queue::new(name, durability));
        self.queues.store(Arc::clone(&queue));
        Ok(queue)
    }

    /// Get a queue by name
    pub fn get_queue(&self, name: &str) -> Result<Arc<Queue>> {
        self.queues.get(name)
    }

    /// List all queues, sorted by name ascending
    pub fn list_queues(&self) -> Vec<Arc<Queue>> {
        self.queues.find()
    }

    /// Delete a queue. The reserved dead-letter queue is protected.
    pub fn delete_queue(&self, name: &str) -> Result<()> {
        self.queues.delete(name)
    }

    // ==================== Message Operations ====================

    /// Publish a message directly to a queue
    pub fn publish_to_queue(&self, queue_name: &str, message: Message) -> Result<()> {
        let queue = self.queues.get(queue_name)?;
        debug!(queue = %queue_name, message_id = %message.id, "Message published");
        queue.enqueue(message);
        Ok(())
    }

    /// Read-only snapshot of up to `limit` messages from the head of a queue
    pub fn peek(&self, queue_name: &str, limit: usize) -> Result<Vec<Message>> {
        let queue = self.queues.get(queue_name)?;
        Ok(queue.peek(limit))
    }

    /// Destructively consume up to `limit` messages: each one is dequeued
    /// and immediately acknowledged. Returns fewer (or none) when the queue
    /// runs out of pending messages; an empty result is not an error.
    pub fn consume(&self, queue_name: &str, limit: usize) -> Result<Vec<Message>> {
        let queue = self.queues.get(queue_name)?;

        let mut result = Vec::new();
        for _ in 0..limit {
            let Some(message) = queue.dequeue() else {
                break;
            };

            // Only a concurrent purge can make this ack miss.
            let _ = queue.ack(message.id);
            debug!(queue = %queue_name, message_id = %message.id, "Message consumed");
            result.push(message);
        }

        Ok(result)
    }

    /// Discard every message in a queue, in-flight ones included
    pub fn purge(&self, queue_name: &str) -> Result<usize> {
        let queue = self.queues.get(queue_name)?;
        let count = queue.purge();
        info!(queue = %queue_name, count, "Queue purged");
        Ok(count)
    }

    /// Acknowledge an in-flight message, removing it
    pub fn ack(&self, queue_name: &str, message_id: Uuid) -> Result<()> {
        let queue = self.queues.get(queue_name)?;
        queue.ack(message_id)?;
        debug!(queue = %queue_name, message_id = %message_id, "Message acknowledged");
        Ok(())
    }

    /// Negatively acknowledge an in-flight message, moving it to the
    /// dead-letter queue as a fresh pending message.
    pub fn nack(&self, queue_name: &str, message_id: Uuid) -> Result<()> {
        let queue = self.queues.get(queue_name)?;
        let message = queue.nack(message_id)?;

        let dead_letter_queue = self.queues.get(DEAD_LETTER_QUEUE_NAME)?;
        dead_letter_queue.enqueue(message);
        debug!(queue = %queue_name, message_id = %message_id, "Message dead-lettered");

        Ok(())
    }

    // ==================== Exchange Operations ====================

    /// Create a new exchange
    pub fn create_exchange(&self, name: &str) -> Result<Arc<Exchange>> {
        if self.exchanges.get(name).is_ok() {
            return Err(Error::ExchangeAlreadyExists(name.to_string()));
        }

        let exchange = Arc::new(Exchange::new(name));
        self.exchanges.store(Arc::clone(&exchange));
        Ok(exchange)
    }

    /// Get an exchange by name
    pub fn get_exchange(&self, name: &str) -> Result<Arc<Exchange>> {
        self.exchanges.get(name)
    }

    /// List all exchanges, sorted by name ascending
    pub fn list_exchanges(&self) -> Vec<Arc<Exchange>> {
        self.exchanges.find()
    }

    /// Delete an exchange
    pub fn delete_exchange(&self, name: &str) -> Result<()> {
        self.exchanges.delete(name)
    }

    /// Add a binding to an exchange. The target queue must exist at bind
    /// time; a later queue deletion leaves a dangling binding that fanout
    /// publish will surface as `QueueNotFound`.
    pub fn add_binding(&self, exchange_name: &str, binding: Binding) -> Result<Binding> {
        self.queues.get(&binding.queue)?;

        let added = binding.clone();
        self.exchanges.add_binding(exchange_name, binding)?;
        Ok(added)
    }

    /// Remove a binding from an exchange by id
    pub fn delete_binding(&self, exchange_name: &str, binding_id: Uuid) -> Result<()> {
        self.exchanges.delete_binding(exchange_name, binding_id)
    }

    /// Fan a message out to every queue bound to an exchange, in binding
    /// insertion order.
    ///
    /// Not transactional: when the Nth binding's queue is missing, the
    /// first N-1 queues keep the message and the error for the failing
    /// binding is surfaced as-is.
    pub fn publish_to_exchange(&self, exchange_name: &str, message: Message) -> Result<()> {
        let exchange = self.exchanges.get(exchange_name)?;

        for binding in exchange.bindings() {
            let queue = self.queues.get(&binding.queue)?;
            queue.enqueue(message.clone());
            debug!(
                exchange = %exchange_name,
                queue = %binding.queue,
                message_id = %message.id,
                "Message routed"
            );
        }

        Ok(())
    }
}

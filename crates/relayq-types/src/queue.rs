//! Queue entity and its visibility/ack state machine
//!
//! A [`Queue`] is an ordered, at-least-once mailbox with explicit
//! acknowledgment. Each message moves through `Pending -> InFlight ->
//! Removed` (ack), or is handed back to the caller on nack for dead-letter
//! forwarding. There is no timeout-based return from in-flight to pending:
//! a consumer crash leaves the message in flight until an explicit nack.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::Message;

/// Name of the reserved dead-letter queue, created at bootstrap and exempt
/// from deletion.
pub const DEAD_LETTER_QUEUE_NAME: &str = "system.dead-letter";

/// Queue durability marker.
///
/// Informational only in this design: no disk-backed store exists, so
/// durable queues are lost on restart just like transient ones. Kept as a
/// forward-compatible marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    Durable,
    Transient,
}

impl Durability {
    /// All accepted wire values, in declaration order
    pub const VALUES: [&'static str; 2] = ["durable", "transient"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Durability::Durable => "durable",
            Durability::Transient => "transient",
        }
    }

    /// Parse a wire value, `None` if it is not one of [`Self::VALUES`]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "durable" => Some(Durability::Durable),
            "transient" => Some(Durability::Transient),
            _ => None,
        }
    }
}

impl std::fmt::Display for Durability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered mailbox of messages, insertion order = delivery order.
///
/// The message sequence and every message's `in_flight` flag are guarded by
/// an internal lock held for the full duration of each compound operation,
/// so no two concurrent [`Queue::dequeue`] calls can return the same
/// message and ack/nack observe a consistent in-flight snapshot.
///
/// A queue is never copied: repositories hand out shared references to the
/// single tracked instance.
#[derive(Debug)]
pub struct Queue {
    name: String,
    durability: Durability,
    system: bool,
    messages: Mutex<Vec<Message>>,
}

impl Queue {
    /// Create a new empty queue
    pub fn new(name: impl Into<String>, durability: Durability) -> Self {
        Self {
            name: name.into(),
            durability,
            system: false,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Create a reserved system queue (exempt from deletion)
    pub fn system(name: impl Into<String>, durability: Durability) -> Self {
        Self {
            system: true,
            ..Self::new(name, durability)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Number of messages currently held, in-flight ones included
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Append a message to the tail. Always succeeds.
    pub fn enqueue(&self, message: Message) {
        self.messages.lock().push(message);
    }

    /// Return the first pending message, marking it in flight.
    ///
    /// The message stays in the queue at its original position until acked
    /// or nacked. `None` means nothing is available right now, which is an
    /// empty result, not an error; callers that want to wait must poll.
    pub fn dequeue(&self) -> Option<Message> {
        let mut messages = self.messages.lock();
        for message in messages.iter_mut() {
            if !message.in_flight {
                message.in_flight = true;
                return Some(message.clone());
            }
        }

        None
    }

    /// Remove an in-flight message by id.
    ///
    /// Not idempotent: acking twice fails with `MessageNotFound`, as does
    /// acking a message that was never dequeued.
    pub fn ack(&self, message_id: Uuid) -> Result<()> {
        let mut messages = self.messages.lock();
        match messages
            .iter()
            .position(|m| m.id == message_id && m.in_flight)
        {
            Some(index) => {
                messages.remove(index);
                Ok(())
            }
            None => Err(Error::MessageNotFound(message_id)),
        }
    }

    /// Remove an in-flight message by id and hand it back, pending again.
    ///
    /// The caller is responsible for forwarding the returned message to the
    /// dead-letter queue; resolving another queue by name is a repository
    /// concern, not a queue one.
    pub fn nack(&self, message_id: Uuid) -> Result<Message> {
        let mut messages = self.messages.lock();
        match messages
            .iter()
            .position(|m| m.id == message_id && m.in_flight)
        {
            Some(index) => {
                let mut message = messages.remove(index);
                message.in_flight = false;
                Ok(message)
            }
            None => Err(Error::MessageNotFound(message_id)),
        }
    }

    /// Read-only snapshot of up to `limit` messages from the head.
    ///
    /// Never alters in-flight state or removes anything. A `limit` larger
    /// than the queue length is clamped.
    pub fn peek(&self, limit: usize) -> Vec<Message> {
        let messages = self.messages.lock();
        messages[..limit.min(messages.len())].to_vec()
    }

    /// Unconditionally empty the queue, discarding in-flight messages too.
    /// Returns the number of messages discarded.
    pub fn purge(&self) -> usize {
        let mut messages = self.messages.lock();
        let count = messages.len();
        messages.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    fn queue_with(payloads: &[&str]) -> Queue {
        let queue = Queue::new("events", Durability::Durable);
        for payload in payloads {
            queue.enqueue(Message::new(*payload));
        }
        queue
    }

    #[test]
    fn test_dequeue_returns_head_and_marks_in_flight() {
        let queue = queue_with(&["A", "B", "C"]);

        let msg = queue.dequeue().unwrap();
        assert_eq!(msg.payload, "A");
        assert!(msg.in_flight);

        // The message stays in place; peek is unaffected by in-flight state.
        assert_eq!(queue.len(), 3);
        let peeked = queue.peek(2);
        assert_eq!(peeked.len(), 2);
        assert_eq!(peeked[0].payload, "A");
        assert_eq!(peeked[1].payload, "B");
    }

    #[test]
    fn test_dequeue_skips_in_flight_messages() {
        let queue = queue_with(&["A", "B"]);

        let first = queue.dequeue().unwrap();
        let second = queue.dequeue().unwrap();
        assert_eq!(first.payload, "A");
        assert_eq!(second.payload, "B");
        assert_ne!(first.id, second.id);

        // Everything is in flight now.
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_dequeue_on_empty_queue_is_not_an_error() {
        let queue = queue_with(&[]);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_ack_removes_message_and_is_not_idempotent() {
        let queue = queue_with(&["A"]);

        let msg = queue.dequeue().unwrap();
        queue.ack(msg.id).unwrap();
        assert!(queue.is_empty());

        assert_eq!(queue.ack(msg.id), Err(Error::MessageNotFound(msg.id)));
    }

    #[test]
    fn test_ack_requires_in_flight() {
        let queue = queue_with(&["A"]);
        let pending_id = queue.peek(1)[0].id;

        // Present but never dequeued.
        assert_eq!(
            queue.ack(pending_id),
            Err(Error::MessageNotFound(pending_id))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_nack_returns_pending_message() {
        let queue = queue_with(&["A", "B"]);

        let msg = queue.dequeue().unwrap();
        let returned = queue.nack(msg.id).unwrap();

        assert_eq!(returned.id, msg.id);
        assert!(!returned.in_flight);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_nack_requires_in_flight() {
        let queue = queue_with(&["A"]);
        let pending_id = queue.peek(1)[0].id;

        assert!(matches!(
            queue.nack(pending_id),
            Err(Error::MessageNotFound(_))
        ));
    }

    #[test]
    fn test_peek_clamps_limit_and_never_mutates() {
        let queue = queue_with(&["A", "B", "C"]);

        assert!(queue.peek(0).is_empty());
        assert_eq!(queue.peek(2).len(), 2);
        assert_eq!(queue.peek(100).len(), 3);

        // No peek variant altered any state.
        assert_eq!(queue.len(), 3);
        let msg = queue.dequeue().unwrap();
        assert_eq!(msg.payload, "A");
    }

    #[test]
    fn test_purge_discards_in_flight_messages_too() {
        let queue = queue_with(&["A", "B", "C"]);
        queue.dequeue().unwrap();

        assert_eq!(queue.purge(), 3);
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_concurrent_dequeues_never_return_the_same_message() {
        let queue = Arc::new(Queue::new("events", Durability::Durable));
        let num_messages = 1000;

        let mut expected = HashSet::new();
        for i in 0..num_messages {
            let message = Message::new(format!("Message {i}"));
            expected.insert(message.id);
            queue.enqueue(message);
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(message) = queue.dequeue() {
                    assert!(message.in_flight);
                    seen.push(message.id);
                }
                seen
            }));
        }

        let mut dequeued = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(dequeued.insert(id), "message delivered twice");
            }
        }

        // Exactly the enqueued set, no duplicates, no omissions.
        assert_eq!(dequeued, expected);
        assert_eq!(queue.len(), num_messages);
    }

    #[test]
    fn test_concurrent_enqueue_dequeue_ack_drains_queue() {
        let queue = Arc::new(Queue::new("events", Durability::Durable));
        let num_messages = 500;

        for i in 0..num_messages {
            queue.enqueue(Message::new(format!("Message {i}")));
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                while let Some(message) = queue.dequeue() {
                    queue.ack(message.id).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(queue.is_empty());
    }
}

//! Sample data for demos and manual testing
//!
//! Seeds a couple of queues and fanout exchanges so the API has something
//! to show right after bootstrap.

use relayq_types::{Binding, Durability, Message, Result};

use crate::broker::Broker;

/// Seed demonstration queues, exchanges and bindings.
///
/// Intended for a fresh broker; fails with a conflict error when any of the
/// sample entities already exist.
pub fn seed(broker: &Broker) -> Result<()> {
    broker.create_queue("events", Durability::Durable)?;
    broker.create_queue("tmp", Durability::Transient)?;

    for i in 1..=5 {
        broker.publish_to_queue("tmp", Message::new(format!("Message {i} (tmp)")))?;
    }

    broker.create_exchange("app.internal")?;
    broker.add_binding("app.internal", Binding::new("events", "#"))?;

    broker.create_exchange("app.external")?;
    broker.add_binding("app.external", Binding::new("tmp", "#"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relayq_storage::{InMemoryExchangeRepository, InMemoryQueueRepository};
    use relayq_types::DEAD_LETTER_QUEUE_NAME;

    use super::*;

    #[test]
    fn test_seed_populates_broker() {
        let broker = Broker::new(
            Arc::new(InMemoryQueueRepository::new()),
            Arc::new(InMemoryExchangeRepository::new()),
        );
        seed(&broker).unwrap();

        let queue_names: Vec<String> = broker
            .list_queues()
            .iter()
            .map(|q| q.name().to_string())
            .collect();
        assert_eq!(queue_names, vec!["events", DEAD_LETTER_QUEUE_NAME, "tmp"]);

        assert_eq!(broker.get_queue("tmp").unwrap().len(), 5);
        assert!(broker.get_queue("events").unwrap().is_empty());

        let exchange = broker.get_exchange("app.internal").unwrap();
        assert_eq!(exchange.bindings()[0].queue, "events");

        // Seeding twice conflicts instead of duplicating.
        assert!(seed(&broker).is_err());
    }
}

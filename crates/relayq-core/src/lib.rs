//! RelayQ Core - Core broker logic
//!
//! This crate contains the [`Broker`], the orchestrator tying the queue and
//! exchange repositories together: queue lifecycle, publish/consume/ack/
//! nack, exchange fanout publishing, binding management and dead-letter
//! forwarding.

pub mod broker;
pub mod sample;

// Re-exports
pub use broker::Broker;

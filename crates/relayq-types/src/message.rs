//! Message types for RelayQ

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A payload unit owned by exactly one queue at a time.
///
/// The `in_flight` flag tracks delivery state and is only ever read or
/// written under the owning queue's lock. It is never serialized: a nacked
/// message arrives at the dead-letter queue as a fresh pending message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Unique message identifier (within its current queue)
    pub id: Uuid,

    /// Opaque message payload
    pub payload: String,

    /// Delivered to a consumer but not yet acknowledged
    #[serde(skip)]
    pub in_flight: bool,
}

impl Message {
    /// Create a new pending message with a random id
    pub fn new(payload: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), payload)
    }

    /// Create a new pending message with a known id
    pub fn with_id(id: Uuid, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
            in_flight: false,
        }
    }
}

//! Message type carried through topics
//!
//! A message is created once at publish time and never mutated afterwards.
//! Dequeuing moves it out of the topic, so at most one consumer holds it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable message published to a topic
///
/// # Example
///
/// ```rust
/// use topicbroker::broker::api::Message;
///
/// let message = Message::new("p1", "orders", "order #1 placed");
/// assert_eq!(message.topic(), "orders");
/// assert_eq!(message.content(), "order #1 placed");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    content: String,
    topic: String,
    producer_id: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        producer_id: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            topic: topic.into(),
            producer_id: producer_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//! HybridBroker - fans one publish out to the in-memory broker and an
//! optional secondary sink
//!
//! The in-memory publish decides the outcome. A secondary sink failure is
//! logged and never fails or blocks the in-memory path.

use crate::broker::api::{BrokerError, BrokerResult, EntityKind, Message, MessageBroker};
use crate::hybrid::settings::QueueMode;
use crate::hybrid::sink::SecondarySink;
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the hybrid broker's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HybridStatus {
    pub mode: String,
    pub use_in_memory: bool,
    pub use_secondary: bool,
    pub enable_hybrid: bool,
    pub secondary_sink: Option<String>,
}

pub struct HybridBroker {
    broker: Arc<MessageBroker>,
    sink: Option<Arc<dyn SecondarySink>>,
    mode: QueueMode,
}

impl HybridBroker {
    pub fn new(
        broker: Arc<MessageBroker>,
        sink: Option<Arc<dyn SecondarySink>>,
        mode: QueueMode,
    ) -> Self {
        if mode.use_secondary && sink.is_none() {
            log::warn!("Secondary publishing is enabled but no secondary sink is configured");
        }
        log::info!("Hybrid broker initialised in mode: {}", mode.describe());
        Self { broker, sink, mode }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn broker(&self) -> &Arc<MessageBroker> {
        &self.broker
    }

    /// Build a message and publish it to every enabled destination
    ///
    /// Fails with `InvalidState` when no destination is enabled, and with
    /// the in-memory broker's error when the topic does not exist.
    pub async fn publish_message(
        &self,
        producer_id: &str,
        topic: &str,
        content: &str,
    ) -> BrokerResult<Message> {
        let secondary = self.secondary();
        if !self.mode.use_in_memory && secondary.is_none() {
            return Err(BrokerError::invalid_state(format!(
                "Cannot publish to '{}': queue mode is {}",
                topic,
                self.mode.describe()
            )));
        }

        let message = Message::new(producer_id, topic, content);

        if self.mode.use_in_memory {
            log::info!(
                "Publishing to in-memory queue: topic={}, message={}",
                topic,
                message.id()
            );
            self.broker.publish_message(topic, message.clone())?;
        }

        if let Some(sink) = secondary {
            log::info!(
                "Publishing to secondary sink '{}': topic={}, message={}",
                sink.name(),
                topic,
                message.id()
            );
            if let Err(e) = sink.publish(topic, &message).await {
                log::error!(
                    "Secondary sink '{}' failed for message {}: {}",
                    sink.name(),
                    message.id(),
                    e
                );
            }
        }

        if self.mode.is_hybrid() {
            log::debug!("Message {} published to both destinations", message.id());
        }
        Ok(message)
    }

    /// Messages currently held for `topic`; not supported
    pub fn get_messages_for_topic(&self, topic: &str) -> BrokerResult<Vec<Message>> {
        log::warn!("Listing messages for topic '{}' is not supported", topic);
        Err(BrokerError::unimplemented("get_messages_for_topic"))
    }

    pub fn subscribe_consumer(&self, consumer_id: &str, topic: &str) -> BrokerResult<()> {
        self.broker
            .consumers()
            .subscribe_consumer_to_topic(consumer_id, topic)
    }

    pub fn unsubscribe_consumer(&self, consumer_id: &str, topic: &str) -> BrokerResult<bool> {
        self.broker
            .consumers()
            .unsubscribe_consumer_from_topic(consumer_id, topic)
    }

    /// Topics the consumer is subscribed to, sorted by name
    pub fn subscribed_topics(&self, consumer_id: &str) -> BrokerResult<Vec<String>> {
        let consumer = self
            .broker
            .consumers()
            .get_consumer(consumer_id)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Consumer, consumer_id))?;
        let mut topics = consumer.subscribed_topics();
        topics.sort();
        Ok(topics)
    }

    pub fn status(&self) -> HybridStatus {
        HybridStatus {
            mode: self.mode.describe().to_string(),
            use_in_memory: self.mode.use_in_memory,
            use_secondary: self.mode.use_secondary,
            enable_hybrid: self.mode.enable_hybrid,
            secondary_sink: self.sink.as_ref().map(|sink| sink.name().to_string()),
        }
    }

    fn secondary(&self) -> Option<&Arc<dyn SecondarySink>> {
        self.sink.as_ref().filter(|_| self.mode.use_secondary)
    }
}

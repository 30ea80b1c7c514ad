//! Consumers and the consumer registry
//!
//! A consumer is an identity with a set of topic subscriptions, an optional
//! consumer-group name and an active flag. The flag and the cancellation
//! token of its polling loop change together under one lock, so a loop is
//! always bound to the activation that started it.

use crate::broker::error::{BrokerError, BrokerResult, EntityKind};
use crate::broker::handler::{DeliveryError, LoggingHandler, MessageHandler};
use crate::broker::message::Message;
use crate::broker::topic::TopicStore;
use crate::core::sync::{handle_rwlock_write, recover_guard};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

pub struct Consumer {
    id: String,
    name: String,
    group: Option<String>,
    created_at: DateTime<Utc>,
    active: AtomicBool,
    subscriptions: RwLock<HashSet<String>>,
    cancellation: Mutex<Option<CancellationToken>>,
    handler: Arc<dyn MessageHandler>,
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("group", &self.group)
            .field("active", &self.is_active())
            .field("subscriptions", &self.subscribed_topics())
            .finish()
    }
}

impl Consumer {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        group: Option<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.filter(|g| !g.is_empty()),
            created_at: Utc::now(),
            active: AtomicBool::new(false),
            subscriptions: RwLock::new(HashSet::new()),
            cancellation: Mutex::new(None),
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Snapshot of the subscribed topic names, in no particular order
    pub fn subscribed_topics(&self) -> Vec<String> {
        recover_guard(self.subscriptions.read())
            .iter()
            .cloned()
            .collect()
    }

    pub fn is_subscribed_to(&self, topic: &str) -> bool {
        recover_guard(self.subscriptions.read()).contains(topic)
    }

    pub(crate) fn subscribe(&self, topic: &str) -> BrokerResult<bool> {
        let mut subscriptions =
            handle_rwlock_write(self.subscriptions.write(), BrokerError::invalid_state)?;
        Ok(subscriptions.insert(topic.to_string()))
    }

    pub(crate) fn unsubscribe(&self, topic: &str) -> BrokerResult<bool> {
        let mut subscriptions =
            handle_rwlock_write(self.subscriptions.write(), BrokerError::invalid_state)?;
        Ok(subscriptions.remove(topic))
    }

    /// Move Inactive -> Active
    ///
    /// Returns the token the new polling loop must watch, or `None` when the
    /// consumer was already active. A token cancelled by an earlier stop is
    /// replaced with a fresh one.
    pub(crate) fn activate(&self) -> Option<CancellationToken> {
        let mut slot = recover_guard(self.cancellation.lock());
        if self.active.load(Ordering::Acquire) {
            return None;
        }

        let token = match slot.as_ref() {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                *slot = Some(token.clone());
                token
            }
        };
        self.active.store(true, Ordering::Release);
        Some(token)
    }

    /// Move to Inactive and signal the polling loop
    pub(crate) fn stop(&self) {
        let slot = recover_guard(self.cancellation.lock());
        self.active.store(false, Ordering::Release);
        if let Some(token) = slot.as_ref() {
            token.cancel();
        }
    }

    pub(crate) async fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.handler.handle_message(&self.id, message).await
    }
}

/// Registry of consumers, keyed by id
pub struct ConsumerRegistry {
    consumers: RwLock<HashMap<String, Arc<Consumer>>>,
    topics: Arc<TopicStore>,
}

impl ConsumerRegistry {
    /// Subscriptions are validated against `topics`
    pub fn new(topics: Arc<TopicStore>) -> Self {
        Self {
            consumers: RwLock::new(HashMap::new()),
            topics,
        }
    }

    /// Register a consumer that logs its deliveries
    pub fn create_consumer(
        &self,
        id: &str,
        name: &str,
        group: Option<&str>,
    ) -> BrokerResult<Arc<Consumer>> {
        self.create_consumer_with_handler(id, name, group, Arc::new(LoggingHandler))
    }

    pub fn create_consumer_with_handler(
        &self,
        id: &str,
        name: &str,
        group: Option<&str>,
        handler: Arc<dyn MessageHandler>,
    ) -> BrokerResult<Arc<Consumer>> {
        let mut consumers =
            handle_rwlock_write(self.consumers.write(), BrokerError::invalid_state)?;
        if consumers.contains_key(id) {
            return Err(BrokerError::already_exists(EntityKind::Consumer, id));
        }

        let consumer = Arc::new(Consumer::new(id, name, group.map(str::to_string), handler));
        consumers.insert(id.to_string(), Arc::clone(&consumer));
        log::info!("Consumer '{}' created (group: {:?})", id, consumer.group());
        Ok(consumer)
    }

    pub fn get_consumer(&self, id: &str) -> Option<Arc<Consumer>> {
        recover_guard(self.consumers.read()).get(id).cloned()
    }

    pub fn list_consumers(&self) -> Vec<Arc<Consumer>> {
        recover_guard(self.consumers.read()).values().cloned().collect()
    }

    /// Stop the consumer, then remove it
    ///
    /// Stopping cancels the polling loop's token, so no loop outlives the
    /// registry entry.
    pub fn delete_consumer(&self, id: &str) -> BrokerResult<bool> {
        if let Some(consumer) = self.get_consumer(id) {
            consumer.stop();
        }

        let mut consumers =
            handle_rwlock_write(self.consumers.write(), BrokerError::invalid_state)?;
        let removed = consumers.remove(id).is_some();
        if removed {
            log::info!("Consumer '{}' deleted", id);
        }
        Ok(removed)
    }

    /// Subscribe to an existing topic; subscribing twice is a no-op
    pub fn subscribe_consumer_to_topic(&self, consumer_id: &str, topic: &str) -> BrokerResult<()> {
        let consumer = self
            .get_consumer(consumer_id)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Consumer, consumer_id))?;
        if self.topics.get_topic(topic).is_none() {
            return Err(BrokerError::not_found(EntityKind::Topic, topic));
        }

        if consumer.subscribe(topic)? {
            log::info!("Consumer '{}' subscribed to topic '{}'", consumer_id, topic);
        }
        Ok(())
    }

    /// Returns whether the consumer was subscribed
    pub fn unsubscribe_consumer_from_topic(
        &self,
        consumer_id: &str,
        topic: &str,
    ) -> BrokerResult<bool> {
        let consumer = self
            .get_consumer(consumer_id)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Consumer, consumer_id))?;

        let removed = consumer.unsubscribe(topic)?;
        if removed {
            log::info!("Consumer '{}' unsubscribed from topic '{}'", consumer_id, topic);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer(id: &str) -> Consumer {
        Consumer::new(id, id, None, Arc::new(LoggingHandler))
    }

    #[test]
    fn test_activate_is_idempotent() {
        let consumer = consumer("c1");

        let token = consumer.activate();
        assert!(token.is_some());
        assert!(consumer.is_active());
        assert!(consumer.activate().is_none());
    }

    #[test]
    fn test_stop_cancels_token_and_restart_gets_fresh_one() {
        let consumer = consumer("c1");
        let first = consumer.activate().unwrap();

        consumer.stop();
        assert!(!consumer.is_active());
        assert!(first.is_cancelled());

        let second = consumer.activate().unwrap();
        assert!(!second.is_cancelled());
        assert!(first.is_cancelled());
    }

    #[test]
    fn test_empty_group_name_means_ungrouped() {
        let consumer = Consumer::new("c1", "c1", Some(String::new()), Arc::new(LoggingHandler));
        assert_eq!(consumer.group(), None);
    }
}

//! Topics and the topic store
//!
//! Each topic owns an unbounded FIFO queue behind its own mutex, so work on
//! one topic never contends with another. The store maps names to topics.

use crate::broker::error::{BrokerError, BrokerResult, EntityKind};
use crate::broker::message::Message;
use crate::core::sync::{handle_mutex_poison, handle_rwlock_write, recover_guard};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// A named FIFO queue of messages
#[derive(Debug)]
pub struct Topic {
    name: String,
    created_at: DateTime<Utc>,
    messages: Mutex<VecDeque<Message>>,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a message at the tail
    pub fn enqueue(&self, message: Message) -> BrokerResult<()> {
        self.queue()?.push_back(message);
        Ok(())
    }

    /// Remove and return the head message, or `None` when empty
    pub fn try_dequeue(&self) -> BrokerResult<Option<Message>> {
        Ok(self.queue()?.pop_front())
    }

    pub fn message_count(&self) -> BrokerResult<usize> {
        Ok(self.queue()?.len())
    }

    pub fn has_messages(&self) -> BrokerResult<bool> {
        Ok(!self.queue()?.is_empty())
    }

    fn queue(&self) -> BrokerResult<MutexGuard<'_, VecDeque<Message>>> {
        handle_mutex_poison(self.messages.lock(), BrokerError::invalid_state)
    }
}

/// Owner of every topic queue
///
/// # Example
///
/// ```rust
/// use topicbroker::broker::api::{Message, TopicStore};
///
/// let store = TopicStore::new();
/// store.create_topic("orders").unwrap();
/// store.enqueue("orders", Message::new("p1", "orders", "a")).unwrap();
/// assert_eq!(store.message_count("orders").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TopicStore {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl TopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty topic; fails if the name is taken
    pub fn create_topic(&self, name: &str) -> BrokerResult<Arc<Topic>> {
        let mut topics = handle_rwlock_write(self.topics.write(), BrokerError::invalid_state)?;
        if topics.contains_key(name) {
            return Err(BrokerError::already_exists(EntityKind::Topic, name));
        }

        let topic = Arc::new(Topic::new(name));
        topics.insert(name.to_string(), Arc::clone(&topic));
        log::info!("Topic '{}' created", name);
        Ok(topic)
    }

    pub fn get_topic(&self, name: &str) -> Option<Arc<Topic>> {
        recover_guard(self.topics.read()).get(name).cloned()
    }

    pub fn list_topics(&self) -> Vec<Arc<Topic>> {
        recover_guard(self.topics.read()).values().cloned().collect()
    }

    /// Remove a topic and drop its queued messages
    pub fn delete_topic(&self, name: &str) -> BrokerResult<bool> {
        let mut topics = handle_rwlock_write(self.topics.write(), BrokerError::invalid_state)?;
        let removed = topics.remove(name);
        if let Some(topic) = &removed {
            log::info!(
                "Topic '{}' deleted ({} pending messages dropped)",
                name,
                topic.message_count().unwrap_or(0)
            );
        }
        Ok(removed.is_some())
    }

    pub fn enqueue(&self, name: &str, message: Message) -> BrokerResult<()> {
        self.require(name)?.enqueue(message)
    }

    pub fn try_dequeue(&self, name: &str) -> BrokerResult<Option<Message>> {
        self.require(name)?.try_dequeue()
    }

    pub fn message_count(&self, name: &str) -> BrokerResult<usize> {
        self.require(name)?.message_count()
    }

    pub fn has_messages(&self, name: &str) -> BrokerResult<bool> {
        self.require(name)?.has_messages()
    }

    fn require(&self, name: &str) -> BrokerResult<Arc<Topic>> {
        self.get_topic(name)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Topic, name))
    }
}

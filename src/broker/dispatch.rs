//! MessageBroker - publish path and per-consumer polling loops
//!
//! Each started consumer gets one spawned task bound to a cancellation
//! token. A task repeatedly walks the consumer's subscriptions, consults the
//! consumer's group for round-robin turns, dequeues at most one message per
//! topic and hands it to the consumer's delivery handler, then sleeps for
//! the poll interval.
//!
//! ```text
//!  publish ──► TopicStore ──► [topic queue] ◄── try_dequeue ── poll pass
//!                                                               │
//!                           ConsumerGroup::take_turn ◄──────────┤ (grouped)
//!                                                               ▼
//!                                                     MessageHandler
//! ```

use crate::broker::consumer::{Consumer, ConsumerRegistry};
use crate::broker::error::{BrokerError, BrokerResult, EntityKind};
use crate::broker::group::ConsumerGroupRegistry;
use crate::broker::handler::{LoggingHandler, MessageHandler};
use crate::broker::message::Message;
use crate::broker::topic::TopicStore;
use crate::core::sync::recover_guard;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll passes a group member may miss before its turn passes on
const TURN_GRACE_PASSES: u32 = 3;

/// Timing knobs for the polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Sleep between two passes over a consumer's subscriptions
    pub poll_interval: Duration,
    /// Upper bound on how long `stop_consumer` waits for a loop to exit
    pub stop_timeout: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// What a polling task needs besides its consumer
#[derive(Clone)]
struct PollContext {
    topics: Arc<TopicStore>,
    groups: Arc<ConsumerGroupRegistry>,
    poll_interval: Duration,
}

impl PollContext {
    fn turn_grace(&self) -> Duration {
        self.poll_interval * TURN_GRACE_PASSES
    }
}

pub struct MessageBroker {
    topics: Arc<TopicStore>,
    consumers: Arc<ConsumerRegistry>,
    groups: Arc<ConsumerGroupRegistry>,
    settings: BrokerSettings,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl MessageBroker {
    pub fn new(
        topics: Arc<TopicStore>,
        consumers: Arc<ConsumerRegistry>,
        groups: Arc<ConsumerGroupRegistry>,
    ) -> Self {
        Self::with_settings(topics, consumers, groups, BrokerSettings::default())
    }

    pub fn with_settings(
        topics: Arc<TopicStore>,
        consumers: Arc<ConsumerRegistry>,
        groups: Arc<ConsumerGroupRegistry>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            topics,
            consumers,
            groups,
            settings,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> BrokerSettings {
        self.settings
    }

    /// Enqueue `message` on an existing topic
    pub fn publish_message(&self, topic: &str, message: Message) -> BrokerResult<()> {
        let target = self
            .topics
            .get_topic(topic)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Topic, topic))?;

        log::debug!(
            "Publishing message {} from '{}' to topic '{}'",
            message.id(),
            message.producer_id(),
            topic
        );
        target.enqueue(message)
    }

    /// Create a consumer that logs its deliveries and join it to `group`
    pub fn register_consumer(
        &self,
        id: &str,
        name: &str,
        group: Option<&str>,
    ) -> BrokerResult<Arc<Consumer>> {
        self.register_consumer_with_handler(id, name, group, Arc::new(LoggingHandler))
    }

    /// Create a consumer and, if `group` is named, add it to that group
    ///
    /// The group is created on first use. The consumer's stored group name
    /// and its membership therefore always agree.
    pub fn register_consumer_with_handler(
        &self,
        id: &str,
        name: &str,
        group: Option<&str>,
        handler: Arc<dyn MessageHandler>,
    ) -> BrokerResult<Arc<Consumer>> {
        let consumer = self
            .consumers
            .create_consumer_with_handler(id, name, group, handler)?;

        if let Some(group_name) = consumer.group() {
            self.groups.get_or_create_consumer_group(group_name)?;
            self.groups.add_consumer_to_group(group_name, &consumer)?;
        }
        Ok(consumer)
    }

    /// Stop, leave the group, then remove the consumer
    pub async fn delete_consumer(&self, consumer_id: &str) -> BrokerResult<bool> {
        self.stop_consumer(consumer_id).await;

        if let Some(group) = self
            .consumers
            .get_consumer(consumer_id)
            .and_then(|consumer| consumer.group().map(str::to_string))
            .and_then(|name| self.groups.get_consumer_group(&name))
        {
            group.remove_consumer(consumer_id)?;
        }
        self.consumers.delete_consumer(consumer_id)
    }

    /// Activate a consumer and spawn its polling loop
    ///
    /// Starting an active consumer does nothing. Must be called from within
    /// a Tokio runtime.
    pub fn start_consumer(&self, consumer_id: &str) -> BrokerResult<()> {
        let consumer = self
            .consumers
            .get_consumer(consumer_id)
            .ok_or_else(|| BrokerError::not_found(EntityKind::Consumer, consumer_id))?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            BrokerError::invalid_state(format!(
                "Cannot start consumer '{}' outside an async runtime: {}",
                consumer_id, e
            ))
        })?;

        let Some(token) = consumer.activate() else {
            log::debug!("Consumer '{}' is already active", consumer_id);
            return Ok(());
        };

        let handle = runtime.spawn(poll_loop(self.poll_context(), consumer, token));
        let mut tasks = recover_guard(self.tasks.lock());
        // Consumers deleted through the registry alone leave finished loops
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(consumer_id.to_string(), handle);
        log::info!("Consumer '{}' started", consumer_id);
        Ok(())
    }

    /// Deactivate a consumer and wait, bounded, for its loop to finish
    ///
    /// Unknown consumers are ignored. A loop that overruns the stop timeout
    /// is left to exit on its own.
    pub async fn stop_consumer(&self, consumer_id: &str) {
        if let Some(consumer) = self.consumers.get_consumer(consumer_id) {
            consumer.stop();
        }

        let handle = recover_guard(self.tasks.lock()).remove(consumer_id);
        if let Some(handle) = handle {
            self.await_task(consumer_id, handle).await;
        }
    }

    /// Stop every registered consumer, one after another
    pub async fn stop_all_consumers(&self) {
        for consumer in self.consumers.list_consumers() {
            self.stop_consumer(consumer.id()).await;
        }

        // Loops of consumers deleted through the registry alone
        let leftovers: Vec<(String, JoinHandle<()>)> =
            recover_guard(self.tasks.lock()).drain().collect();
        for (consumer_id, handle) in leftovers {
            self.await_task(&consumer_id, handle).await;
        }
    }

    /// Whether a polling task for `consumer_id` is still running
    pub fn is_polling(&self, consumer_id: &str) -> bool {
        recover_guard(self.tasks.lock())
            .get(consumer_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of polling tasks that have not finished
    pub fn polling_task_count(&self) -> usize {
        recover_guard(self.tasks.lock())
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Number of task handles held, finished or not
    pub fn tracked_task_count(&self) -> usize {
        recover_guard(self.tasks.lock()).len()
    }

    pub fn topics(&self) -> &Arc<TopicStore> {
        &self.topics
    }

    pub fn consumers(&self) -> &Arc<ConsumerRegistry> {
        &self.consumers
    }

    pub fn groups(&self) -> &Arc<ConsumerGroupRegistry> {
        &self.groups
    }

    async fn await_task(&self, consumer_id: &str, handle: JoinHandle<()>) {
        match tokio::time::timeout(self.settings.stop_timeout, handle).await {
            Ok(Ok(())) => log::info!("Consumer '{}' stopped", consumer_id),
            Ok(Err(e)) if e.is_cancelled() => {
                log::debug!("Polling task for consumer '{}' was cancelled", consumer_id)
            }
            Ok(Err(e)) => log::warn!(
                "Polling task for consumer '{}' ended abnormally: {}",
                consumer_id,
                e
            ),
            Err(_) => log::warn!(
                "Consumer '{}' did not stop within {:?}; continuing",
                consumer_id,
                self.settings.stop_timeout
            ),
        }
    }

    fn poll_context(&self) -> PollContext {
        PollContext {
            topics: Arc::clone(&self.topics),
            groups: Arc::clone(&self.groups),
            poll_interval: self.settings.poll_interval,
        }
    }
}

async fn poll_loop(context: PollContext, consumer: Arc<Consumer>, token: CancellationToken) {
    log::debug!("Polling loop for consumer '{}' running", consumer.id());

    while !token.is_cancelled() && consumer.is_active() {
        match AssertUnwindSafe(poll_pass(&context, &consumer, &token))
            .catch_unwind()
            .await
        {
            Ok(Ok(0)) => {}
            Ok(Ok(delivered)) => log::trace!(
                "Consumer '{}' received {} message(s) this pass",
                consumer.id(),
                delivered
            ),
            Ok(Err(e)) => log::error!("Error in consumer '{}': {}", consumer.id(), e),
            Err(panic) => log::error!(
                "Poll pass for consumer '{}' panicked: {}",
                consumer.id(),
                panic_message(panic.as_ref())
            ),
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(context.poll_interval) => {}
        }
    }

    log::debug!("Polling loop for consumer '{}' exited", consumer.id());
}

/// One pass over the consumer's subscriptions; returns the delivery count
async fn poll_pass(
    context: &PollContext,
    consumer: &Consumer,
    token: &CancellationToken,
) -> BrokerResult<usize> {
    let mut delivered = 0;

    for topic_name in consumer.subscribed_topics() {
        if token.is_cancelled() {
            break;
        }

        let Some(topic) = context.topics.get_topic(&topic_name) else {
            continue;
        };
        if !topic.has_messages()? {
            continue;
        }

        let message = match consumer
            .group()
            .map(|name| (name, context.groups.get_consumer_group(name)))
        {
            Some((_, Some(group))) => group.take_turn(
                &topic_name,
                consumer.id(),
                context.turn_grace(),
                || topic.try_dequeue(),
            )?,
            Some((group_name, None)) => {
                log::trace!(
                    "Group '{}' of consumer '{}' is not registered; polling ungrouped",
                    group_name,
                    consumer.id()
                );
                topic.try_dequeue()?
            }
            None => topic.try_dequeue()?,
        };

        if let Some(message) = message {
            let message_id = message.id().to_string();
            if let Err(e) = consumer.deliver(message).await {
                log::warn!(
                    "Delivery of message {} to consumer '{}' failed: {}",
                    message_id,
                    consumer.id(),
                    e
                );
            }
            delivered += 1;
        }

        tokio::task::yield_now().await;
    }

    Ok(delivered)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

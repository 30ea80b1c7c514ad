//! One-shot construction of the broker's registries
//!
//! Every registry is built once here and shared by handle; nothing in the
//! broker lives in a global.

use crate::broker::consumer::ConsumerRegistry;
use crate::broker::dispatch::{BrokerSettings, MessageBroker};
use crate::broker::group::ConsumerGroupRegistry;
use crate::broker::producer::ProducerRegistry;
use crate::broker::topic::TopicStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct BrokerServices {
    topics: Arc<TopicStore>,
    producers: Arc<ProducerRegistry>,
    consumers: Arc<ConsumerRegistry>,
    groups: Arc<ConsumerGroupRegistry>,
    broker: Arc<MessageBroker>,
}

impl BrokerServices {
    pub fn new(settings: BrokerSettings) -> Self {
        let topics = Arc::new(TopicStore::new());
        let producers = Arc::new(ProducerRegistry::new());
        let consumers = Arc::new(ConsumerRegistry::new(Arc::clone(&topics)));
        let groups = Arc::new(ConsumerGroupRegistry::new());
        let broker = Arc::new(MessageBroker::with_settings(
            Arc::clone(&topics),
            Arc::clone(&consumers),
            Arc::clone(&groups),
            settings,
        ));

        Self {
            topics,
            producers,
            consumers,
            groups,
            broker,
        }
    }

    pub fn topics(&self) -> &Arc<TopicStore> {
        &self.topics
    }

    pub fn producers(&self) -> &Arc<ProducerRegistry> {
        &self.producers
    }

    pub fn consumers(&self) -> &Arc<ConsumerRegistry> {
        &self.consumers
    }

    pub fn groups(&self) -> &Arc<ConsumerGroupRegistry> {
        &self.groups
    }

    pub fn broker(&self) -> &Arc<MessageBroker> {
        &self.broker
    }
}

impl Default for BrokerServices {
    fn default() -> Self {
        Self::new(BrokerSettings::default())
    }
}

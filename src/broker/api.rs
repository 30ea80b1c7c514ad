//! Public API for the broker
//!
//! External modules should import from here rather than from the internal
//! modules.

// Entities and their registries
pub use crate::broker::consumer::{Consumer, ConsumerRegistry};
pub use crate::broker::group::{ConsumerGroup, ConsumerGroupRegistry};
pub use crate::broker::producer::{Producer, ProducerRegistry};
pub use crate::broker::topic::{Topic, TopicStore};

// Messages and delivery
pub use crate::broker::handler::{
    ChannelHandler, Delivery, DeliveryError, LoggingHandler, MessageHandler,
};
pub use crate::broker::message::Message;

// Dispatch engine and wiring
pub use crate::broker::dispatch::{
    BrokerSettings, MessageBroker, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT,
};
pub use crate::broker::services::BrokerServices;

// Error handling
pub use crate::broker::error::{BrokerError, BrokerResult, EntityKind};

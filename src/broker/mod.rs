//! In-process topic broker
//!
//! Producers publish messages to named topics; consumers subscribe to topics
//! and receive messages from a polling loop of their own. Consumers that
//! share a consumer group compete for a topic's messages in round-robin
//! order. Ungrouped consumers on the same topic race for each message.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   publish    ┌─────────────────────────────────────────┐
//! │  Producer  │ ───────────► │ TopicStore                              │
//! └────────────┘              │  orders: [m1][m2][m3]   (per-topic lock) │
//!                             │  audit:  [m9]                           │
//!                             └───────────────▲─────────────────────────┘
//!                                             │ try_dequeue
//!           ┌─────────────────────────────────┼──────────────────┐
//!           │ poll loop (c1)    poll loop (c2)│   poll loop (c3)  │
//!           └───────┬──────────────────┬──────┴──────────────────┘
//!                   │ take_turn        │
//!                   ▼                  ▼
//!             ConsumerGroup "g" (one offset per topic)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use topicbroker::broker::api::{BrokerServices, Message};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let services = BrokerServices::default();
//! services.topics().create_topic("orders")?;
//! services.producers().create_producer("p1", "Order service")?;
//!
//! let broker = services.broker();
//! broker.register_consumer("c1", "Billing", Some("g"))?;
//! services.consumers().subscribe_consumer_to_topic("c1", "orders")?;
//! broker.start_consumer("c1")?;
//!
//! broker.publish_message("orders", Message::new("p1", "orders", "order #1"))?;
//!
//! broker.stop_all_consumers().await;
//! # Ok(())
//! # }
//! ```

mod consumer;
mod dispatch;
mod error;
mod group;
mod handler;
mod message;
mod producer;
mod services;
mod topic;

pub mod api;

#[cfg(test)]
mod tests;

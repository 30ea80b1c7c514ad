//! Delivery callbacks invoked by a consumer's polling loop
//!
//! A handler is a side-effecting notification: the broker neither waits for
//! an acknowledgment nor retries when a handler fails.

use crate::broker::message::Message;
use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub type DeliveryError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every message dequeued on behalf of a consumer
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, consumer_id: &str, message: Message)
        -> Result<(), DeliveryError>;
}

/// Default handler: logs each delivery
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle_message(
        &self,
        consumer_id: &str,
        message: Message,
    ) -> Result<(), DeliveryError> {
        log::info!(
            "{} received '{}' from topic '{}'",
            consumer_id,
            message.content(),
            message.topic()
        );
        Ok(())
    }
}

/// A message as seen by the consumer it was delivered to
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub consumer_id: String,
    pub message: Message,
}

/// Forwards deliveries into an unbounded channel
///
/// Several consumers may share one handler; the receiver then observes the
/// interleaved delivery stream of all of them.
///
/// ```rust
/// use topicbroker::broker::api::ChannelHandler;
///
/// let (handler, mut deliveries) = ChannelHandler::new();
/// assert!(deliveries.try_recv().is_err());
/// # drop(handler);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: UnboundedSender<Delivery>,
}

impl ChannelHandler {
    pub fn new() -> (Self, UnboundedReceiver<Delivery>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessageHandler for ChannelHandler {
    async fn handle_message(
        &self,
        consumer_id: &str,
        message: Message,
    ) -> Result<(), DeliveryError> {
        self.sender
            .send(Delivery {
                consumer_id: consumer_id.to_string(),
                message,
            })
            .map_err(|_| "delivery receiver dropped".into())
    }
}

//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use topicbroker::broker::api::{BrokerServices, BrokerSettings, ChannelHandler, Delivery};

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const WAIT: Duration = Duration::from_secs(2);

pub fn fast_services() -> BrokerServices {
    BrokerServices::new(BrokerSettings {
        poll_interval: POLL_INTERVAL,
        stop_timeout: Duration::from_secs(1),
    })
}

/// Register and subscribe a consumer whose deliveries go to `handler`
pub fn add_consumer(
    services: &BrokerServices,
    handler: &ChannelHandler,
    id: &str,
    group: Option<&str>,
    topics: &[&str],
) {
    services
        .broker()
        .register_consumer_with_handler(id, id, group, Arc::new(handler.clone()))
        .unwrap();
    for topic in topics {
        services
            .consumers()
            .subscribe_consumer_to_topic(id, topic)
            .unwrap();
    }
}

/// Receive `count` deliveries, failing the test after `WAIT`
pub async fn expect_deliveries(
    receiver: &mut UnboundedReceiver<Delivery>,
    count: usize,
) -> Vec<Delivery> {
    let mut deliveries = Vec::with_capacity(count);
    while deliveries.len() < count {
        match tokio::time::timeout(WAIT, receiver.recv()).await {
            Ok(Some(delivery)) => deliveries.push(delivery),
            _ => panic!("expected {} deliveries, got {}", count, deliveries.len()),
        }
    }
    deliveries
}

/// Wait long enough for several polling passes
pub async fn settle() {
    tokio::time::sleep(POLL_INTERVAL * 10).await;
}

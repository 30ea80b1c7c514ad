//! Test modules for the broker
//!
//! Organised by component, bottom-up: topic store, registries, consumer
//! groups, dispatch engine, and end-to-end scenarios.

mod topics;

use crate::broker::api::{BrokerServices, BrokerSettings, Delivery};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub(super) const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Services with a short poll interval so dispatch tests run quickly
pub(super) fn fast_services() -> BrokerServices {
    BrokerServices::new(BrokerSettings {
        poll_interval: TEST_POLL_INTERVAL,
        stop_timeout: Duration::from_secs(1),
    })
}

/// Receive exactly `count` deliveries or fail after `within`
pub(super) async fn collect_deliveries(
    receiver: &mut UnboundedReceiver<Delivery>,
    count: usize,
    within: Duration,
) -> Vec<Delivery> {
    let mut deliveries = Vec::with_capacity(count);
    let deadline = tokio::time::Instant::now() + within;
    while deliveries.len() < count {
        match tokio::time::timeout_at(deadline, receiver.recv()).await {
            Ok(Some(delivery)) => deliveries.push(delivery),
            Ok(None) => panic!("delivery channel closed after {}", deliveries.len()),
            Err(_) => panic!(
                "expected {} deliveries within {:?}, got {}",
                count,
                within,
                deliveries.len()
            ),
        }
    }
    deliveries
}

/// Let several poll intervals pass
pub(super) async fn settle() {
    tokio::time::sleep(TEST_POLL_INTERVAL * 10).await;
}

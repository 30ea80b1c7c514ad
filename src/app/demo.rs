//! Demo scenario
//!
//! Two topics, two producers and five consumers. Every consumer listens on
//! the first topic, consumers 1, 3 and 4 also on the second. Five messages
//! are published through the hybrid broker with a pause between each, then
//! the consumers get a moment to drain the topics.

use crate::broker::api::{BrokerResult, BrokerServices, ChannelHandler, Delivery};
use crate::hybrid::api::HybridBroker;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;

pub const DEMO_TOPICS: [&str; 2] = ["demo-topic1", "demo-topic2"];
pub const DEMO_PRODUCERS: [(&str, &str); 2] = [
    ("demo-producer1", "Demo Producer 1"),
    ("demo-producer2", "Demo Producer 2"),
];
pub const DEMO_CONSUMER_COUNT: usize = 5;
const SECOND_TOPIC_CONSUMERS: [usize; 3] = [1, 3, 4];
const DEMO_PREFIX: &str = "demo-";

/// (producer, topic, content) in publish order
const SCRIPT: [(&str, &str, &str); 5] = [
    ("demo-producer1", "demo-topic1", "Demo Message 1"),
    ("demo-producer1", "demo-topic1", "Demo Message 2"),
    ("demo-producer2", "demo-topic1", "Demo Message 3"),
    ("demo-producer1", "demo-topic2", "Demo Message 4"),
    ("demo-producer2", "demo-topic2", "Demo Message 5"),
];

#[derive(Debug, Clone, Default)]
pub struct DemoOptions {
    /// Consumer group shared by all demo consumers
    pub group: Option<String>,
    pub warmup: Duration,
    pub publish_gap: Duration,
    pub drain: Duration,
    /// Leave demo entities registered afterwards
    pub keep: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DemoReport {
    pub mode: String,
    pub steps: Vec<String>,
    pub published: usize,
    /// Message contents received, per consumer
    pub deliveries: BTreeMap<String, Vec<String>>,
    pub interrupted: bool,
}

impl DemoReport {
    pub fn delivered(&self) -> usize {
        self.deliveries.values().map(Vec::len).sum()
    }

    fn step(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.steps.push(text);
    }
}

pub fn consumer_id(index: usize) -> String {
    format!("demo-consumer{}", index)
}

/// Run the scenario; a shutdown signal cuts any pause short
pub async fn run_scenario(
    services: &BrokerServices,
    hybrid: &HybridBroker,
    options: &DemoOptions,
    mut shutdown: broadcast::Receiver<()>,
) -> BrokerResult<DemoReport> {
    let mode = hybrid.mode();
    let mut report = DemoReport {
        mode: mode.describe().to_string(),
        ..DemoReport::default()
    };
    report.step(format!("Running demo in {} mode", report.mode));

    for topic in DEMO_TOPICS {
        services.topics().create_topic(topic)?;
    }
    report.step(format!("Created topics: {}", DEMO_TOPICS.join(", ")));

    for (id, name) in DEMO_PRODUCERS {
        services.producers().create_producer(id, name)?;
    }
    report.step("Created producers: demo-producer1, demo-producer2");

    let mut receiver = None;
    if mode.use_in_memory {
        receiver = Some(start_consumers(services, hybrid, options, &mut report)?);
        report.interrupted = pause(options.warmup, &mut shutdown).await;
    }

    for (index, (producer, topic, content)) in SCRIPT.iter().enumerate() {
        if report.interrupted {
            break;
        }
        if index > 0 && pause(options.publish_gap, &mut shutdown).await {
            report.interrupted = true;
            break;
        }
        hybrid.publish_message(producer, topic, content).await?;
        report.published += 1;
        report.step(format!("{} published '{}' to {}", producer, content, topic));
    }

    if !report.interrupted {
        report.interrupted = pause(options.drain, &mut shutdown).await;
    }

    services.broker().stop_all_consumers().await;
    if let Some(receiver) = receiver.as_mut() {
        collect(receiver, &mut report);
    }
    if report.interrupted {
        report.step("Demo interrupted");
    }

    if !options.keep {
        cleanup(services, options.group.as_deref(), &mut report).await?;
    }
    Ok(report)
}

fn start_consumers(
    services: &BrokerServices,
    hybrid: &HybridBroker,
    options: &DemoOptions,
    report: &mut DemoReport,
) -> BrokerResult<UnboundedReceiver<Delivery>> {
    let (handler, receiver) = ChannelHandler::new();
    let broker = services.broker();

    for index in 1..=DEMO_CONSUMER_COUNT {
        let id = consumer_id(index);
        broker.register_consumer_with_handler(
            &id,
            &format!("Demo Consumer {}", index),
            options.group.as_deref(),
            Arc::new(handler.clone()),
        )?;
        hybrid.subscribe_consumer(&id, DEMO_TOPICS[0])?;
        if SECOND_TOPIC_CONSUMERS.contains(&index) {
            hybrid.subscribe_consumer(&id, DEMO_TOPICS[1])?;
        }
    }
    match &options.group {
        Some(group) => report.step(format!(
            "Created consumers demo-consumer1 through demo-consumer{} in group '{}'",
            DEMO_CONSUMER_COUNT, group
        )),
        None => report.step(format!(
            "Created consumers demo-consumer1 through demo-consumer{}",
            DEMO_CONSUMER_COUNT
        )),
    }
    report.step("All consumers subscribed to demo-topic1; consumers 1, 3 and 4 to demo-topic2");

    for index in 1..=DEMO_CONSUMER_COUNT {
        broker.start_consumer(&consumer_id(index))?;
    }
    report.step("Started all consumers");
    Ok(receiver)
}

fn collect(receiver: &mut UnboundedReceiver<Delivery>, report: &mut DemoReport) {
    while let Ok(delivery) = receiver.try_recv() {
        log::info!(
            "{} received '{}' from {}",
            delivery.consumer_id,
            delivery.message.content(),
            delivery.message.topic()
        );
        report
            .deliveries
            .entry(delivery.consumer_id)
            .or_default()
            .push(delivery.message.content().to_string());
    }
}

/// Delete every demo entity, including the consumer group named by `group`
async fn cleanup(
    services: &BrokerServices,
    group: Option<&str>,
    report: &mut DemoReport,
) -> BrokerResult<()> {
    let mut consumers = 0;
    for consumer in services.consumers().list_consumers() {
        if consumer.id().starts_with(DEMO_PREFIX)
            && services.broker().delete_consumer(consumer.id()).await?
        {
            consumers += 1;
        }
    }

    let mut producers = 0;
    for producer in services.producers().list_producers() {
        if producer.id().starts_with(DEMO_PREFIX)
            && services.producers().delete_producer(producer.id())?
        {
            producers += 1;
        }
    }

    let mut topics = 0;
    for topic in services.topics().list_topics() {
        if topic.name().starts_with(DEMO_PREFIX) && services.topics().delete_topic(topic.name())? {
            topics += 1;
        }
    }

    report.step(format!(
        "Deleted {} consumers, {} producers and {} topics",
        consumers, producers, topics
    ));

    if let Some(group) = group {
        if services.groups().delete_consumer_group(group)? {
            report.step(format!("Deleted consumer group '{}'", group));
        }
    }
    Ok(())
}

/// Sleep for `duration`; true if shutdown was requested first
async fn pause(duration: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    tokio::select! {
        result = shutdown.recv() => {
            // A closed channel means no signal can arrive any more
            if matches!(result, Err(broadcast::error::RecvError::Closed)) {
                sleep.await;
                return false;
            }
            true
        }
        _ = &mut sleep => false,
    }
}

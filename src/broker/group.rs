//! Consumer groups and round-robin target selection
//!
//! A group holds weak references to its members; the consumer registry owns
//! their lifecycle. Each group keeps one rotating offset per topic. The
//! eligible member list is recomputed on every selection, and the offset is
//! read, used and stored back under a single lock.
//!
//! Polling loops take turns through [`ConsumerGroup::take_turn`]. A turn
//! the selected member leaves unclaimed for longer than the caller's grace
//! period passes to whichever member asks next, so one member stuck in its
//! handler cannot hold the rest of the group back.

use crate::broker::consumer::Consumer;
use crate::broker::error::{BrokerError, BrokerResult, EntityKind};
use crate::core::sync::{handle_mutex_poison, handle_rwlock_write, recover_guard};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::{Duration, Instant};

/// Rotation state of one topic
#[derive(Debug, Default)]
struct Turn {
    offset: usize,
    /// When a member other than the selected one was first refused
    contended_since: Option<Instant>,
}

#[derive(Debug)]
pub struct ConsumerGroup {
    name: String,
    created_at: DateTime<Utc>,
    members: RwLock<Vec<Weak<Consumer>>>,
    turns: Mutex<HashMap<String, Turn>>,
}

impl ConsumerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            members: RwLock::new(Vec::new()),
            turns: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Add a member; returns false if a consumer with this id is already in
    pub fn add_consumer(&self, consumer: &Arc<Consumer>) -> BrokerResult<bool> {
        let mut members = handle_rwlock_write(self.members.write(), BrokerError::invalid_state)?;
        members.retain(|member| member.strong_count() > 0);
        if members
            .iter()
            .filter_map(Weak::upgrade)
            .any(|member| member.id() == consumer.id())
        {
            return Ok(false);
        }

        members.push(Arc::downgrade(consumer));
        Ok(true)
    }

    pub fn remove_consumer(&self, consumer_id: &str) -> BrokerResult<bool> {
        let mut members = handle_rwlock_write(self.members.write(), BrokerError::invalid_state)?;
        members.retain(|member| member.strong_count() > 0);
        let before = members.len();
        members.retain(|member| {
            member
                .upgrade()
                .is_some_and(|consumer| consumer.id() != consumer_id)
        });
        Ok(members.len() < before)
    }

    /// Live members in insertion order
    pub fn consumers(&self) -> Vec<Arc<Consumer>> {
        recover_guard(self.members.read())
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers().len()
    }

    /// Members that are active and subscribed to `topic`
    pub fn eligible_consumers(&self, topic: &str) -> Vec<Arc<Consumer>> {
        self.consumers()
            .into_iter()
            .filter(|consumer| consumer.is_active() && consumer.is_subscribed_to(topic))
            .collect()
    }

    /// Offset for `topic`, reduced modulo the current eligible count
    ///
    /// 0 if never selected. With no eligible member the stored value is
    /// returned as is.
    pub fn offset(&self, topic: &str) -> BrokerResult<usize> {
        let turns = self.turns()?;
        let stored = turns.get(topic).map_or(0, |turn| turn.offset);
        match self.eligible_consumers(topic).len() {
            0 => Ok(stored),
            eligible => Ok(stored % eligible),
        }
    }

    /// Select the next eligible member for `topic` and advance the offset
    ///
    /// Returns `None` when no member is both active and subscribed.
    pub fn next_consumer(&self, topic: &str) -> BrokerResult<Option<Arc<Consumer>>> {
        let mut turns = self.turns()?;
        let eligible = self.eligible_consumers(topic);
        if eligible.is_empty() {
            return Ok(None);
        }

        let turn = turns.entry(topic.to_string()).or_default();
        let selected = Arc::clone(&eligible[turn.offset % eligible.len()]);
        turn.offset = (turn.offset + 1) % eligible.len();
        turn.contended_since = None;
        Ok(Some(selected))
    }

    /// Run `take` on `consumer_id`'s turn for `topic`
    ///
    /// `take` runs under the offset lock, and the offset only moves past the
    /// caller when it yields a value. A caller out of turn gets `None`
    /// unless the selected member has left the turn unclaimed for longer
    /// than `stale_after`; the caller then takes the turn over.
    pub fn take_turn<T>(
        &self,
        topic: &str,
        consumer_id: &str,
        stale_after: Duration,
        take: impl FnOnce() -> BrokerResult<Option<T>>,
    ) -> BrokerResult<Option<T>> {
        let mut turns = self.turns()?;
        let eligible = self.eligible_consumers(topic);
        let Some(position) = eligible
            .iter()
            .position(|consumer| consumer.id() == consumer_id)
        else {
            return Ok(None);
        };

        let turn = turns.entry(topic.to_string()).or_default();
        let selected = turn.offset % eligible.len();
        if selected == position {
            turn.contended_since = None;
        } else {
            let since = *turn.contended_since.get_or_insert_with(Instant::now);
            if since.elapsed() <= stale_after {
                return Ok(None);
            }
            log::debug!(
                "Consumer '{}' takes over the turn of '{}' on topic '{}' in group '{}'",
                consumer_id,
                eligible[selected].id(),
                topic,
                self.name
            );
        }

        let taken = take()?;
        if taken.is_some() {
            turn.offset = (position + 1) % eligible.len();
            turn.contended_since = None;
        }
        Ok(taken)
    }

    fn turns(&self) -> BrokerResult<MutexGuard<'_, HashMap<String, Turn>>> {
        handle_mutex_poison(self.turns.lock(), BrokerError::invalid_state)
    }
}

#[derive(Debug, Default)]
pub struct ConsumerGroupRegistry {
    groups: RwLock<HashMap<String, Arc<ConsumerGroup>>>,
}

impl ConsumerGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_consumer_group(&self, name: &str) -> BrokerResult<Arc<ConsumerGroup>> {
        let mut groups = handle_rwlock_write(self.groups.write(), BrokerError::invalid_state)?;
        if groups.contains_key(name) {
            return Err(BrokerError::already_exists(EntityKind::ConsumerGroup, name));
        }

        let group = Arc::new(ConsumerGroup::new(name));
        groups.insert(name.to_string(), Arc::clone(&group));
        log::info!("Consumer group '{}' created", name);
        Ok(group)
    }

    /// Return the named group, creating it when absent
    pub fn get_or_create_consumer_group(&self, name: &str) -> BrokerResult<Arc<ConsumerGroup>> {
        let mut groups = handle_rwlock_write(self.groups.write(), BrokerError::invalid_state)?;
        let group = groups.entry(name.to_string()).or_insert_with(|| {
            log::info!("Consumer group '{}' created", name);
            Arc::new(ConsumerGroup::new(name))
        });
        Ok(Arc::clone(group))
    }

    pub fn get_consumer_group(&self, name: &str) -> Option<Arc<ConsumerGroup>> {
        recover_guard(self.groups.read()).get(name).cloned()
    }

    pub fn list_consumer_groups(&self) -> Vec<Arc<ConsumerGroup>> {
        recover_guard(self.groups.read()).values().cloned().collect()
    }

    pub fn delete_consumer_group(&self, name: &str) -> BrokerResult<bool> {
        let mut groups = handle_rwlock_write(self.groups.write(), BrokerError::invalid_state)?;
        let removed = groups.remove(name).is_some();
        if removed {
            log::info!("Consumer group '{}' deleted", name);
        }
        Ok(removed)
    }

    /// Register `consumer` as a member of the named group
    ///
    /// This does not touch the consumer's own group name; keeping the two in
    /// step is the caller's job (see `MessageBroker::register_consumer`).
    pub fn add_consumer_to_group(&self, name: &str, consumer: &Arc<Consumer>) -> BrokerResult<()> {
        let group = self
            .get_consumer_group(name)
            .ok_or_else(|| BrokerError::not_found(EntityKind::ConsumerGroup, name))?;

        if group.add_consumer(consumer)? {
            log::info!("Consumer '{}' joined group '{}'", consumer.id(), name);
        }
        Ok(())
    }

    /// Round-robin selection for (group, topic)
    pub fn get_next_consumer(&self, name: &str, topic: &str) -> BrokerResult<Option<Arc<Consumer>>> {
        self.get_consumer_group(name)
            .ok_or_else(|| BrokerError::not_found(EntityKind::ConsumerGroup, name))?
            .next_consumer(topic)
    }
}

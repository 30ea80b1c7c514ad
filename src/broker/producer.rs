//! Producer identities

use crate::broker::error::{BrokerError, BrokerResult, EntityKind};
use crate::core::sync::{handle_rwlock_write, recover_guard};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A registered publisher identity
#[derive(Debug, Clone, PartialEq)]
pub struct Producer {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl Producer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Default)]
pub struct ProducerRegistry {
    producers: RwLock<HashMap<String, Arc<Producer>>>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_producer(&self, id: &str, name: &str) -> BrokerResult<Arc<Producer>> {
        let mut producers =
            handle_rwlock_write(self.producers.write(), BrokerError::invalid_state)?;
        if producers.contains_key(id) {
            return Err(BrokerError::already_exists(EntityKind::Producer, id));
        }

        let producer = Arc::new(Producer::new(id, name));
        producers.insert(id.to_string(), Arc::clone(&producer));
        log::info!("Producer '{}' created", id);
        Ok(producer)
    }

    pub fn get_producer(&self, id: &str) -> Option<Arc<Producer>> {
        recover_guard(self.producers.read()).get(id).cloned()
    }

    pub fn list_producers(&self) -> Vec<Arc<Producer>> {
        recover_guard(self.producers.read()).values().cloned().collect()
    }

    pub fn delete_producer(&self, id: &str) -> BrokerResult<bool> {
        let mut producers =
            handle_rwlock_write(self.producers.write(), BrokerError::invalid_state)?;
        let removed = producers.remove(id).is_some();
        if removed {
            log::info!("Producer '{}' deleted", id);
        }
        Ok(removed)
    }
}

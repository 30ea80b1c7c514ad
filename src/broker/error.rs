//! Broker Error Types

use std::fmt;

/// The kind of registry entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Topic,
    Producer,
    Consumer,
    ConsumerGroup,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Topic => "Topic",
            EntityKind::Producer => "Producer",
            EntityKind::Consumer => "Consumer",
            EntityKind::ConsumerGroup => "Consumer group",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: EntityKind, name: String },

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: EntityKind, name: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Operation not implemented: {operation}")]
    Unimplemented { operation: String },
}

impl BrokerError {
    pub(crate) fn already_exists(kind: EntityKind, name: &str) -> Self {
        BrokerError::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        BrokerError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_state(message: String) -> Self {
        BrokerError::InvalidState { message }
    }

    pub(crate) fn unimplemented(operation: &str) -> Self {
        BrokerError::Unimplemented {
            operation: operation.to_string(),
        }
    }
}

impl crate::core::error_handling::ContextualError for BrokerError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            BrokerError::AlreadyExists { .. } | BrokerError::NotFound { .. }
        )
    }

    fn user_message(&self) -> Option<String> {
        if self.is_user_actionable() {
            Some(self.to_string())
        } else {
            None
        }
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handling::ContextualError;

    #[test]
    fn test_error_messages_name_the_entity() {
        let err = BrokerError::already_exists(EntityKind::Topic, "orders");
        assert_eq!(err.to_string(), "Topic 'orders' already exists");

        let err = BrokerError::not_found(EntityKind::ConsumerGroup, "g");
        assert_eq!(err.to_string(), "Consumer group 'g' does not exist");
    }

    #[test]
    fn test_only_lookup_errors_are_user_actionable() {
        let not_found = BrokerError::not_found(EntityKind::Consumer, "c1");
        assert!(not_found.is_user_actionable());
        assert_eq!(
            not_found.user_message().as_deref(),
            Some("Consumer 'c1' does not exist")
        );

        let poisoned = BrokerError::invalid_state("lock poisoned".to_string());
        assert!(!poisoned.is_user_actionable());
        assert_eq!(poisoned.user_message(), None);
    }
}

//! Generic error handling utilities
//!
//! Provides unified error logging across the broker, hybrid and application
//! error types while keeping each domain's message wording.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; otherwise it should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if the error carries a message the caller can act on directly
    ///
    /// Examples: duplicate entity names, unknown topics, invalid configuration.
    /// Counter-examples: IO failures, poisoned locks.
    fn is_user_actionable(&self) -> bool;

    /// The message to show when the error is user-actionable
    fn user_message(&self) -> Option<String>;
}

/// Log an error with a level of detail matching its kind
///
/// User-actionable errors log their own message; system errors log the
/// operation context and keep the details at debug level.
///
/// # Examples
/// ```rust,no_run
/// # use topicbroker::core::error_handling::log_error_with_context;
/// # use topicbroker::broker::api::{BrokerError, EntityKind};
/// let err = BrokerError::NotFound { kind: EntityKind::Topic, name: "orders".to_string() };
/// log_error_with_context(&err, "Publishing demo messages");
/// // Logs: "FATAL: Topic 'orders' does not exist"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct TestUserError {
        message: String,
    }

    impl fmt::Display for TestUserError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for TestUserError {}

    impl ContextualError for TestUserError {
        fn is_user_actionable(&self) -> bool {
            true
        }

        fn user_message(&self) -> Option<String> {
            Some(self.message.clone())
        }
    }

    #[derive(Debug)]
    struct TestSystemError;

    impl fmt::Display for TestSystemError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "System error: connection refused")
        }
    }

    impl std::error::Error for TestSystemError {}

    impl ContextualError for TestSystemError {
        fn is_user_actionable(&self) -> bool {
            false
        }

        fn user_message(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_user_actionable_error_shows_specific_message() {
        let error = TestUserError {
            message: "Topic 'orders' already exists".to_string(),
        };

        assert!(error.is_user_actionable());
        assert_eq!(
            error.user_message().as_deref(),
            Some("Topic 'orders' already exists")
        );
        log_error_with_context(&error, "Creating topic");
    }

    #[test]
    fn test_system_error_uses_generic_context() {
        let error = TestSystemError;

        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        log_error_with_context(&error, "Opening secondary sink");
    }
}

//! Lock helpers shared by the broker's internal collections
//!
//! Topic queues and round-robin offset tables surface a poisoned lock as an
//! application error. Registry maps, whose mutations are a single insert or
//! remove, recover the guard instead.

use std::sync::{LockResult, RwLockWriteGuard};

/// Convert a poisoned mutex into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use topicbroker::core::sync::handle_mutex_poison;
/// use topicbroker::broker::api::BrokerError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |message| BrokerError::InvalidState { message })
///     .unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). A panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Convert a poisoned RwLock write into an application error
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). A panic occurred while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Take the guard out of a lock result, poisoned or not
///
/// Only for collections where every mutation is a single map operation, so
/// the data behind a poisoned lock is still consistent.
pub fn recover_guard<G>(result: LockResult<G>) -> G {
    result.unwrap_or_else(|poisoned| {
        log::warn!("Recovering poisoned lock guard");
        poisoned.into_inner()
    })
}

//! Synchronisation primitives for internal use
//!
//! Queue locks are only ever held for a single push or pop, thus a
//! spinning mutex is used for them. Long-held locks, like the ones around
//! host state, use the standard library mutex.

mod barrier;
pub(crate) use self::barrier::*;

pub(crate) use ::spin::mutex::Mutex;

use std::sync::{MutexGuard, PoisonError};

///
/// Locks a standard mutex, ignoring poisoning. Worker panics abort the
/// process, thus a poisoned lock is never observed by a live round.
///
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Exclusive row-lock manager.
//!
//! # Responsibility
//! - Grant per-entity exclusive locks to transactions, blocking other
//!   transactions until release.
//!
//! # Invariants
//! - A lock is held for the lifetime of the owning transaction.
//! - Re-acquisition by the holder is a no-op.
//! - Deadlock detection is out of scope; callers take one lock per call.

use crate::store::EntityKey;
use crate::tx::TxId;
use log::debug;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lock acquisition error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// Configured wait limit elapsed before the holder released the lock.
    WaitTimeout { key: EntityKey, waited_ms: u64 },
}

impl Display for LockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitTimeout { key, waited_ms } => {
                write!(f, "gave up waiting for exclusive lock on {key} after {waited_ms}ms")
            }
        }
    }
}

impl Error for LockError {}

/// Blocking exclusive lock table keyed by entity.
#[derive(Debug, Default)]
pub(crate) struct LockManager {
    held: Mutex<HashMap<EntityKey, TxId>>,
    released: Condvar,
}

impl LockManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<EntityKey, TxId>> {
        // Lock bookkeeping is a plain map; a holder that panicked elsewhere
        // cannot leave it half-written.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `owner` holds the exclusive lock on `key`.
    ///
    /// With `wait_limit = None` the wait is unbounded.
    pub(crate) fn acquire_exclusive(
        &self,
        key: EntityKey,
        owner: TxId,
        wait_limit: Option<Duration>,
    ) -> Result<(), LockError> {
        let started_at = Instant::now();
        let mut held = self.table();

        loop {
            match held.get(&key) {
                None => {
                    held.insert(key, owner);
                    debug!("event=lock_acquire module=tx status=ok key={key} tx_id={owner}");
                    return Ok(());
                }
                Some(holder) if *holder == owner => return Ok(()),
                Some(holder) => {
                    debug!(
                        "event=lock_wait module=tx status=blocked key={key} tx_id={owner} holder={holder}"
                    );
                    held = match wait_limit {
                        None => self
                            .released
                            .wait(held)
                            .unwrap_or_else(PoisonError::into_inner),
                        Some(limit) => {
                            let waited = started_at.elapsed();
                            if waited >= limit {
                                return Err(LockError::WaitTimeout {
                                    key,
                                    waited_ms: waited.as_millis() as u64,
                                });
                            }
                            self.released
                                .wait_timeout(held, limit - waited)
                                .unwrap_or_else(PoisonError::into_inner)
                                .0
                        }
                    };
                }
            }
        }
    }

    /// Releases every lock held by `owner` and wakes all waiters.
    pub(crate) fn release_all(&self, owner: TxId) {
        let mut held = self.table();
        let before = held.len();
        held.retain(|_, holder| *holder != owner);
        if held.len() != before {
            debug!(
                "event=lock_release module=tx status=ok tx_id={owner} released={}",
                before - held.len()
            );
        }
        drop(held);
        self.released.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn holder(&self, key: EntityKey) -> Option<TxId> {
        self.table().get(&key).copied()
    }
}

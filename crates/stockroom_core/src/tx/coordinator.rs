//! Transaction bookkeeping and propagation definitions.
//!
//! # Responsibility
//! - Serialize begin/commit/rollback bookkeeping for all transactions of a
//!   store.
//! - Define the propagation policies a unit of work can request.

use crate::tx::{TxId, TxState};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Policy governing whether a unit of work joins an existing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Join the supplied transaction, or begin (and finish) a new one.
    Required,
    /// Fail with `NoActiveTransaction` unless a transaction is supplied.
    Mandatory,
}

/// How a unit of work should be demarcated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxDefinition {
    pub propagation: Propagation,
    /// Overrides the store's default transaction timeout when set.
    pub timeout: Option<Duration>,
}

impl TxDefinition {
    pub fn required() -> Self {
        Self {
            propagation: Propagation::Required,
            timeout: None,
        }
    }

    pub fn mandatory() -> Self {
        Self {
            propagation: Propagation::Mandatory,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Registry of in-flight transactions.
///
/// All lifecycle bookkeeping funnels through this single registry, so begin
/// and finish events are serialized even when transactions run on different
/// threads.
#[derive(Debug, Default)]
pub(crate) struct Coordinator {
    in_flight: Mutex<HashMap<TxId, Instant>>,
}

impl Coordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<TxId, Instant>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, id: TxId, timeout: Option<Duration>) {
        self.registry().insert(id, Instant::now());
        debug!(
            "event=tx_begin module=tx status=ok tx_id={id} timeout_ms={}",
            timeout.map_or_else(|| "none".to_string(), |t| t.as_millis().to_string())
        );
    }

    pub(crate) fn finish(&self, id: TxId, outcome: TxState) {
        let started_at = self.registry().remove(&id);
        match started_at {
            Some(started_at) => debug!(
                "event=tx_finish module=tx status=ok tx_id={id} outcome={outcome} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            None => warn!("event=tx_finish module=tx status=error tx_id={id} outcome={outcome} error_code=unknown_tx"),
        }
    }

    /// Number of transactions currently between begin and commit/rollback.
    pub(crate) fn active_count(&self) -> usize {
        self.registry().len()
    }
}

//! Audit timestamp source.
//!
//! # Responsibility
//! - Provide the clock hook the store invokes on every save to stamp
//!   `created_date` / `last_modified_date`.
//!
//! # Invariants
//! - `created_date` is written once; `last_modified_date` on every save.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Clock hook invoked by the store's save path.
pub trait AuditClock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Default)]
pub struct SystemClock;

impl AuditClock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when advanced.
#[derive(Debug)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn new(start_epoch_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_epoch_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl AuditClock for FixedClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

//! Transaction coordination: unit-of-work demarcation, propagation and
//! row locking.
//!
//! # Responsibility
//! - Define the explicit transaction handle threaded through repository calls.
//! - Demarcate atomic units of work with commit/rollback and a timeout.
//! - Grant exclusive row locks for the lifetime of a transaction.
//!
//! # Invariants
//! - Writes buffered by a transaction are invisible outside it until commit.
//! - A failed unit of work re-raises the original error after rollback, never
//!   a masked rollback error.
//! - Locks held by a transaction are released on commit, rollback or drop.

pub mod coordinator;
pub mod lock;
pub mod transaction;

pub use coordinator::{Propagation, TxDefinition};
pub use lock::LockError;
pub use transaction::{Transaction, TxState};

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Unique identifier of one transaction.
pub type TxId = Uuid;

/// Result type for transaction lifecycle operations.
pub type TxResult<T> = Result<T, TxError>;

/// Transaction lifecycle error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// MANDATORY propagation was requested without an enclosing transaction.
    NoActiveTransaction,
    /// Operation on a handle that already committed or rolled back.
    NotActive { id: TxId, state: TxState },
    /// Transaction exceeded its configured duration and was rolled back.
    Timeout { id: TxId, limit_ms: u64 },
}

impl Display for TxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveTransaction => {
                write!(f, "mandatory propagation requires an active transaction")
            }
            Self::NotActive { id, state } => {
                write!(f, "transaction {id} is no longer active (state: {state})")
            }
            Self::Timeout { id, limit_ms } => {
                write!(f, "transaction {id} exceeded its {limit_ms}ms timeout and was rolled back")
            }
        }
    }
}

impl Error for TxError {}

//! In-memory entity store for the catalog tables.
//!
//! # Responsibility
//! - Hold the committed `categories` and `products` tables and assign
//!   identifiers on first persist.
//! - Own the transaction coordinator and lock manager; all mutation flows
//!   through transactions begun here.
//! - Invoke the audit clock hook on every category save.
//!
//! # Invariants
//! - Reads outside a transaction see the last committed state only.
//! - Every product's `category_id` resolves to an existing category between
//!   commits; violations are rejected at commit time.
//! - Assigned identifiers are never reused or reassigned.

mod audit;
mod tables;

pub use audit::{AuditClock, FixedClock, SystemClock};
pub(crate) use tables::Tables;

use crate::model::{Category, CategoryId, Product, ProductId};
use crate::tx::coordinator::{Coordinator, Propagation, TxDefinition};
use crate::tx::lock::LockManager;
use crate::tx::{LockError, Transaction, TxError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Result type for store and transaction operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error for constraint, transaction and lock failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// A saved product references a category missing at commit time.
    ForeignKeyViolation {
        product_id: ProductId,
        category_id: CategoryId,
    },
    /// A deleted category is still referenced by surviving products.
    CategoryInUse {
        category_id: CategoryId,
        referencing_products: u64,
    },
    /// An entity carried an identifier the store never assigned.
    UnknownId(EntityKey),
    Tx(TxError),
    Lock(LockError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignKeyViolation {
                product_id,
                category_id,
            } => write!(
                f,
                "product {product_id} references missing category {category_id}"
            ),
            Self::CategoryInUse {
                category_id,
                referencing_products,
            } => write!(
                f,
                "category {category_id} is still referenced by {referencing_products} product(s)"
            ),
            Self::UnknownId(key) => write!(f, "no stored entity with id {key}"),
            Self::Tx(err) => write!(f, "{err}"),
            Self::Lock(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tx(err) => Some(err),
            Self::Lock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TxError> for StoreError {
    fn from(value: TxError) -> Self {
        Self::Tx(value)
    }
}

impl From<LockError> for StoreError {
    fn from(value: LockError) -> Self {
        Self::Lock(value)
    }
}

/// Table an entity row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Product,
}

/// Row address used by the lock manager and id diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityKey {
    pub fn category(id: CategoryId) -> Self {
        Self {
            kind: EntityKind::Category,
            id,
        }
    }

    pub fn product(id: ProductId) -> Self {
        Self {
            kind: EntityKind::Product,
            id,
        }
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let table = match self.kind {
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
        };
        write!(f, "{table}/{}", self.id)
    }
}

/// Store behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreConfig {
    /// Transactions past this duration are rolled back at their next
    /// operation and report a timeout. `None` means unbounded.
    pub transaction_timeout: Option<Duration>,
    /// Upper bound on blocking lock waits. `None` means wait forever.
    pub lock_wait_limit: Option<Duration>,
}

/// In-memory catalog store.
pub struct Store {
    tables: Mutex<Tables>,
    next_category_id: AtomicI64,
    next_product_id: AtomicI64,
    clock: Arc<dyn AuditClock>,
    locks: LockManager,
    coordinator: Coordinator,
    config: StoreConfig,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store with default configuration and the wall clock.
    pub fn new() -> Self {
        Self::with_clock(StoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store with an injected audit clock, for deterministic tests.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn AuditClock>) -> Self {
        info!(
            "event=store_open module=store status=ok tx_timeout_ms={} lock_wait_ms={}",
            config
                .transaction_timeout
                .map_or_else(|| "none".to_string(), |t| t.as_millis().to_string()),
            config
                .lock_wait_limit
                .map_or_else(|| "none".to_string(), |t| t.as_millis().to_string()),
        );
        Self {
            tables: Mutex::new(Tables::default()),
            next_category_id: AtomicI64::new(1),
            next_product_id: AtomicI64::new(1),
            clock,
            locks: LockManager::new(),
            coordinator: Coordinator::new(),
            config,
        }
    }

    // ----- transaction demarcation -----

    /// Begins a transaction with the store's default timeout.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::begin(self, self.config.transaction_timeout)
    }

    /// Begins a transaction with an explicit timeout (`None` = unbounded).
    pub fn begin_with(&self, timeout: Option<Duration>) -> Transaction<'_> {
        Transaction::begin(self, timeout)
    }

    /// Runs `body` under the given definition: joins `current` when supplied,
    /// otherwise behaves per the propagation policy.
    ///
    /// For a transaction begun here, `body`'s error rolls it back and the
    /// original error is re-raised; a rollback failure never masks it.
    pub fn execute<T, E, F>(
        &self,
        definition: &TxDefinition,
        current: Option<&mut Transaction<'_>>,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        match (definition.propagation, current) {
            (_, Some(tx)) => body(tx),
            (Propagation::Mandatory, None) => {
                Err(E::from(StoreError::Tx(TxError::NoActiveTransaction)))
            }
            (Propagation::Required, None) => {
                let timeout = definition.timeout.or(self.config.transaction_timeout);
                let mut tx = self.begin_with(timeout);
                match body(&mut tx) {
                    Ok(value) => {
                        tx.commit().map_err(E::from)?;
                        Ok(value)
                    }
                    Err(err) => {
                        let _ = tx.rollback();
                        Err(err)
                    }
                }
            }
        }
    }

    /// REQUIRED propagation: join `current` or begin-and-finish a new
    /// transaction around `body`.
    pub fn required<T, E, F>(
        &self,
        current: Option<&mut Transaction<'_>>,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.execute(&TxDefinition::required(), current, body)
    }

    /// MANDATORY propagation: join `current` or fail with
    /// `NoActiveTransaction`.
    pub fn mandatory<T, E, F>(
        &self,
        current: Option<&mut Transaction<'_>>,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.execute(&TxDefinition::mandatory(), current, body)
    }

    // ----- committed reads -----

    /// Committed row count of the `categories` table.
    pub fn category_count(&self) -> u64 {
        self.tables_guard().categories.len() as u64
    }

    /// Committed row count of the `products` table.
    pub fn product_count(&self) -> u64 {
        self.tables_guard().products.len() as u64
    }

    /// Number of transactions currently in flight.
    pub fn active_transactions(&self) -> usize {
        self.coordinator.active_count()
    }

    pub(crate) fn committed_category(&self, id: CategoryId) -> Option<Category> {
        self.tables_guard().categories.get(&id).cloned()
    }

    pub(crate) fn committed_product(&self, id: ProductId) -> Option<Product> {
        self.tables_guard().products.get(&id).cloned()
    }

    /// Consistent clone of both committed tables, taken under one guard.
    pub(crate) fn clone_tables(&self) -> Tables {
        self.tables_guard().clone()
    }

    // ----- internals shared with the transaction handle -----

    pub(crate) fn tables_guard(&self) -> MutexGuard<'_, Tables> {
        // Commit application never leaves the maps half-written, so a
        // poisoned guard still protects consistent state.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn allocate_category_id(&self) -> CategoryId {
        self.next_category_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn allocate_product_id(&self) -> ProductId {
        self.next_product_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn now_epoch_ms(&self) -> i64 {
        self.clock.now_epoch_ms()
    }

    pub(crate) fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub(crate) fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }
}

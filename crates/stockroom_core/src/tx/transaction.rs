//! Explicit transaction handle and write buffer.
//!
//! # Responsibility
//! - Buffer entity mutations until commit (read-your-writes within the
//!   handle, invisible outside it).
//! - Apply the buffer atomically at commit under the store mutex, after
//!   checking referential constraints against the merged final state.
//!
//! # Invariants
//! - Identifiers are allocated at save time and survive rollback unused;
//!   they are never handed to another entity.
//! - Commit, rollback and drop all release the transaction's locks exactly
//!   once.
//! - A handle past its deadline is rolled back by the next operation and
//!   reports a timeout.

use crate::model::{Category, CategoryId, Product, ProductId};
use crate::store::{EntityKey, Store, StoreError, StoreResult, Tables};
use crate::tx::{TxError, TxId};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle state of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    RolledBack,
}

impl Display for TxState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// One buffered row mutation.
#[derive(Debug, Clone)]
enum Pending<T> {
    Upsert(T),
    Delete,
}

/// Uncommitted writes of one transaction, keyed by row id.
#[derive(Debug, Default)]
struct WriteBuffer {
    categories: BTreeMap<CategoryId, Pending<Category>>,
    products: BTreeMap<ProductId, Pending<Product>>,
}

impl WriteBuffer {
    fn len(&self) -> usize {
        self.categories.len() + self.products.len()
    }

    fn clear(&mut self) {
        self.categories.clear();
        self.products.clear();
    }
}

/// Explicit unit-of-work handle threaded through repository calls.
///
/// Dropping an active handle rolls it back.
pub struct Transaction<'s> {
    store: &'s Store,
    id: TxId,
    state: TxState,
    buffer: WriteBuffer,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl<'s> Transaction<'s> {
    pub(crate) fn begin(store: &'s Store, timeout: Option<Duration>) -> Self {
        let id = Uuid::new_v4();
        store.coordinator().register(id, timeout);
        Self {
            store,
            id,
            state: TxState::Active,
            buffer: WriteBuffer::default(),
            deadline: timeout.map(|t| Instant::now() + t),
            timeout,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    // ----- writes (buffered) -----

    /// Persists a category, assigning id and audit timestamps.
    ///
    /// New entities get id + `created_date`; re-saves keep the stored
    /// `created_date` and refresh `last_modified_date`.
    pub fn save_category(&mut self, category: &Category) -> StoreResult<Category> {
        self.check_active()?;
        let now = self.store.now_epoch_ms();

        let mut persisted = category.clone();
        match category.id {
            None => {
                persisted.id = Some(self.store.allocate_category_id());
                persisted.created_date = Some(now);
            }
            Some(id) => {
                let existing = self
                    .read_category(id)
                    .ok_or(StoreError::UnknownId(EntityKey::category(id)))?;
                persisted.created_date = existing.created_date;
            }
        }
        persisted.last_modified_date = Some(now);

        let id = persisted.id.unwrap_or_default();
        self.buffer
            .categories
            .insert(id, Pending::Upsert(persisted.clone()));
        Ok(persisted)
    }

    /// Persists a product, assigning an id on first save.
    ///
    /// The category reference is checked at commit, not here.
    pub fn save_product(&mut self, product: &Product) -> StoreResult<Product> {
        self.check_active()?;

        let mut persisted = product.clone();
        match product.id {
            None => persisted.id = Some(self.store.allocate_product_id()),
            Some(id) => {
                if self.read_product(id).is_none() {
                    return Err(StoreError::UnknownId(EntityKey::product(id)));
                }
            }
        }

        let id = persisted.id.unwrap_or_default();
        self.buffer
            .products
            .insert(id, Pending::Upsert(persisted.clone()));
        Ok(persisted)
    }

    /// Buffers a category deletion; returns 1 when the row existed in this
    /// transaction's view, 0 otherwise.
    pub fn delete_category(&mut self, id: CategoryId) -> StoreResult<u64> {
        self.check_active()?;
        if self.read_category(id).is_none() {
            return Ok(0);
        }
        self.buffer.categories.insert(id, Pending::Delete);
        Ok(1)
    }

    /// Buffers a product deletion; returns 1 when the row existed in this
    /// transaction's view, 0 otherwise.
    pub fn delete_product(&mut self, id: ProductId) -> StoreResult<u64> {
        self.check_active()?;
        if self.read_product(id).is_none() {
            return Ok(0);
        }
        self.buffer.products.insert(id, Pending::Delete);
        Ok(1)
    }

    // ----- reads (committed state overlaid with this buffer) -----

    pub fn read_category(&self, id: CategoryId) -> Option<Category> {
        match self.buffer.categories.get(&id) {
            Some(Pending::Upsert(category)) => Some(category.clone()),
            Some(Pending::Delete) => None,
            None => self.store.committed_category(id),
        }
    }

    pub fn read_product(&self, id: ProductId) -> Option<Product> {
        match self.buffer.products.get(&id) {
            Some(Pending::Upsert(product)) => Some(product.clone()),
            Some(Pending::Delete) => None,
            None => self.store.committed_product(id),
        }
    }

    /// Merged snapshot of all categories visible to this transaction.
    pub fn categories(&self) -> Vec<Category> {
        let mut merged = self.store.clone_tables().categories;
        for (id, pending) in &self.buffer.categories {
            match pending {
                Pending::Upsert(category) => {
                    merged.insert(*id, category.clone());
                }
                Pending::Delete => {
                    merged.remove(id);
                }
            }
        }
        merged.into_values().collect()
    }

    /// Merged snapshot of all products visible to this transaction.
    pub fn products(&self) -> Vec<Product> {
        let mut merged = self.store.clone_tables().products;
        for (id, pending) in &self.buffer.products {
            match pending {
                Pending::Upsert(product) => {
                    merged.insert(*id, product.clone());
                }
                Pending::Delete => {
                    merged.remove(id);
                }
            }
        }
        merged.into_values().collect()
    }

    // ----- locking -----

    /// Takes the exclusive row lock on `key` for the rest of this
    /// transaction, blocking while another transaction holds it.
    pub fn acquire_exclusive(&mut self, key: EntityKey) -> StoreResult<()> {
        self.check_active()?;
        self.store
            .locks()
            .acquire_exclusive(key, self.id, self.store.config().lock_wait_limit)?;
        Ok(())
    }

    // ----- lifecycle -----

    /// Applies all buffered writes atomically.
    ///
    /// Referential constraints are checked against the merged final state
    /// first; a violation rolls the transaction back and is returned.
    pub fn commit(mut self) -> StoreResult<()> {
        self.check_active()?;

        let mut tables = self.store.tables_guard();
        if let Err(violation) = check_constraints(&self.buffer, &tables) {
            drop(tables);
            warn!(
                "event=tx_commit module=tx status=error tx_id={} error_code=constraint error={violation}",
                self.id
            );
            self.finish(TxState::RolledBack);
            return Err(violation);
        }

        let entries = self.buffer.len();
        apply(&mut tables, std::mem::take(&mut self.buffer));
        drop(tables);

        debug!(
            "event=tx_commit module=tx status=ok tx_id={} entries={entries}",
            self.id
        );
        self.finish(TxState::Committed);
        Ok(())
    }

    /// Discards all buffered writes.
    pub fn rollback(mut self) -> StoreResult<()> {
        if self.state != TxState::Active {
            return Err(StoreError::Tx(TxError::NotActive {
                id: self.id,
                state: self.state,
            }));
        }
        self.finish(TxState::RolledBack);
        Ok(())
    }

    fn check_active(&mut self) -> StoreResult<()> {
        if self.state != TxState::Active {
            return Err(StoreError::Tx(TxError::NotActive {
                id: self.id,
                state: self.state,
            }));
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                let limit_ms = self.timeout.map_or(0, |t| t.as_millis() as u64);
                warn!(
                    "event=tx_timeout module=tx status=rolled_back tx_id={} limit_ms={limit_ms}",
                    self.id
                );
                self.finish(TxState::RolledBack);
                return Err(StoreError::Tx(TxError::Timeout {
                    id: self.id,
                    limit_ms,
                }));
            }
        }

        Ok(())
    }

    fn finish(&mut self, outcome: TxState) {
        self.buffer.clear();
        self.store.locks().release_all(self.id);
        self.store.coordinator().finish(self.id, outcome);
        self.state = outcome;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TxState::Active {
            warn!(
                "event=tx_drop module=tx status=rolled_back tx_id={} buffered={}",
                self.id,
                self.buffer.len()
            );
            self.finish(TxState::RolledBack);
        }
    }
}

/// Validates the merged final state: pending products must resolve their
/// category, pending category deletions must leave no referencing product.
fn check_constraints(buffer: &WriteBuffer, tables: &Tables) -> StoreResult<()> {
    let category_alive = |id: CategoryId| match buffer.categories.get(&id) {
        Some(Pending::Upsert(_)) => true,
        Some(Pending::Delete) => false,
        None => tables.categories.contains_key(&id),
    };

    for (product_id, pending) in &buffer.products {
        if let Pending::Upsert(product) = pending {
            if !category_alive(product.category_id) {
                return Err(StoreError::ForeignKeyViolation {
                    product_id: *product_id,
                    category_id: product.category_id,
                });
            }
        }
    }

    for (category_id, pending) in &buffer.categories {
        if !matches!(pending, Pending::Delete) {
            continue;
        }
        let mut referencing = 0u64;
        for (product_id, product) in &tables.products {
            let survives_with_reference = match buffer.products.get(product_id) {
                Some(Pending::Delete) => false,
                Some(Pending::Upsert(updated)) => updated.category_id == *category_id,
                None => product.category_id == *category_id,
            };
            if survives_with_reference {
                referencing += 1;
            }
        }
        for (product_id, pending_product) in &buffer.products {
            if tables.products.contains_key(product_id) {
                continue;
            }
            if let Pending::Upsert(product) = pending_product {
                if product.category_id == *category_id {
                    referencing += 1;
                }
            }
        }
        if referencing > 0 {
            return Err(StoreError::CategoryInUse {
                category_id: *category_id,
                referencing_products: referencing,
            });
        }
    }

    Ok(())
}

fn apply(tables: &mut Tables, buffer: WriteBuffer) {
    for (id, pending) in buffer.categories {
        match pending {
            Pending::Upsert(category) => {
                tables.categories.insert(id, category);
            }
            Pending::Delete => {
                tables.categories.remove(&id);
            }
        }
    }
    for (id, pending) in buffer.products {
        match pending {
            Pending::Upsert(product) => {
                tables.products.insert(id, product);
            }
            Pending::Delete => {
                tables.products.remove(&id);
            }
        }
    }
}

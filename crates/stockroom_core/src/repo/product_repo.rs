//! Product repository contract and store-backed implementation.
//!
//! # Responsibility
//! - Provide the derived-query, explicit-search, mutating-query, locking and
//!   projection surfaces over the `products` table.
//!
//! # Invariants
//! - Relation-traversal paths (`category.name`) are resolved by joining the
//!   category snapshot taken under the same guard as the product snapshot.
//! - Pure reads see committed state; for-update reads and derived deletes see
//!   the calling transaction's merged view.

use crate::model::{Product, ProductId, ProductPrice, SimpleProduct};
use crate::query::{
    self, Condition, FieldValue, Filter, Page, PageRequest, Record, Slice, SortKey,
};
use crate::repo::RepoResult;
use crate::store::{EntityKey, Store};
use crate::tx::Transaction;
use std::collections::BTreeMap;

/// Product row joined with its category's name, the shape queries run
/// against so `category.name` paths resolve.
#[derive(Debug, Clone)]
struct ProductView {
    product: Product,
    category_name: Option<String>,
}

impl Record for ProductView {
    fn field(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => self.product.id.map(FieldValue::Integer),
            "name" => Some(FieldValue::Text(self.product.name.clone())),
            "price" => Some(FieldValue::Integer(self.product.price)),
            "category.id" => Some(FieldValue::Integer(self.product.category_id)),
            "category.name" => self.category_name.clone().map(FieldValue::Text),
            _ => None,
        }
    }
}

fn join_views(products: Vec<Product>, category_names: &BTreeMap<i64, String>) -> Vec<ProductView> {
    products
        .into_iter()
        .map(|product| ProductView {
            category_name: category_names.get(&product.category_id).cloned(),
            product,
        })
        .collect()
}

/// Repository interface for product operations.
pub trait ProductRepository {
    /// Persists the product; the category reference is checked at commit.
    fn save(&self, tx: &mut Transaction<'_>, product: &Product) -> RepoResult<Product>;
    fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>>;
    /// All products whose category has the exact `name`, in id order.
    fn find_all_by_category_name(&self, name: &str) -> RepoResult<Vec<Product>>;
    fn find_all_by_category_name_sorted(
        &self,
        name: &str,
        sort: &[SortKey],
    ) -> RepoResult<Vec<Product>>;
    fn find_page_by_category_name(
        &self,
        name: &str,
        sort: &[SortKey],
        page: PageRequest,
    ) -> RepoResult<Page<Product>>;
    /// Uncounted paging over one category's products, in id order.
    fn slice_by_category_id(&self, category_id: i64, page: PageRequest)
        -> RepoResult<Slice<Product>>;
    fn count(&self) -> RepoResult<u64>;
    fn count_by_category_name(&self, name: &str) -> RepoResult<u64>;
    fn exists_by_name(&self, name: &str) -> RepoResult<bool>;
    /// Removes every product with the exact name from the transaction's
    /// view; returns the removed count.
    fn delete_by_name(&self, tx: &mut Transaction<'_>, name: &str) -> RepoResult<u64>;
    /// Paged free-text search across `name` OR `category.name` using a SQL
    /// LIKE pattern, with totals counted over the full match set.
    fn search(&self, pattern: &str, page: PageRequest) -> RepoResult<Page<Product>>;
    /// Sets the price of one product; returns the affected-row count.
    fn set_price_by_id(
        &self,
        tx: &mut Transaction<'_>,
        id: ProductId,
        price: i64,
    ) -> RepoResult<u64>;
    /// Reads one product under an exclusive row lock held until the
    /// transaction ends.
    fn find_first_by_id_for_update(
        &self,
        tx: &mut Transaction<'_>,
        id: ProductId,
    ) -> RepoResult<Option<Product>>;
    /// Name-only projection over a LIKE match.
    fn find_simple_by_name_like(&self, pattern: &str) -> RepoResult<Vec<SimpleProduct>>;
    /// Price-only projection over a LIKE match.
    fn find_prices_by_name_like(&self, pattern: &str) -> RepoResult<Vec<ProductPrice>>;
}

/// Store-backed product repository.
pub struct StoreProductRepository<'s> {
    store: &'s Store,
}

impl<'s> StoreProductRepository<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Committed products joined with their category names, one consistent
    /// snapshot.
    fn committed_views(&self) -> Vec<ProductView> {
        let tables = self.store.clone_tables();
        let names: BTreeMap<i64, String> = tables
            .categories
            .iter()
            .map(|(id, category)| (*id, category.name.clone()))
            .collect();
        join_views(tables.products.into_values().collect(), &names)
    }

    /// The calling transaction's merged view, joined the same way.
    fn tx_views(&self, tx: &Transaction<'_>) -> Vec<ProductView> {
        let names: BTreeMap<i64, String> = tx
            .categories()
            .into_iter()
            .filter_map(|category| category.id.map(|id| (id, category.name)))
            .collect();
        join_views(tx.products(), &names)
    }
}

impl ProductRepository for StoreProductRepository<'_> {
    fn save(&self, tx: &mut Transaction<'_>, product: &Product) -> RepoResult<Product> {
        product.validate()?;
        Ok(tx.save_product(product)?)
    }

    fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        Ok(self.store.committed_product(id))
    }

    fn find_all_by_category_name(&self, name: &str) -> RepoResult<Vec<Product>> {
        self.find_all_by_category_name_sorted(name, &[SortKey::asc("id")])
    }

    fn find_all_by_category_name_sorted(
        &self,
        name: &str,
        sort: &[SortKey],
    ) -> RepoResult<Vec<Product>> {
        let matched = query::select(
            &self.committed_views(),
            Some(&Filter::equals("category.name", name)),
            sort,
        )?;
        Ok(matched.into_iter().map(|view| view.product).collect())
    }

    fn find_page_by_category_name(
        &self,
        name: &str,
        sort: &[SortKey],
        page: PageRequest,
    ) -> RepoResult<Page<Product>> {
        let paged = query::select_page(
            &self.committed_views(),
            Some(&Filter::equals("category.name", name)),
            sort,
            page,
        )?;
        Ok(paged.map(|view| view.product))
    }

    fn slice_by_category_id(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> RepoResult<Slice<Product>> {
        let sliced = query::select_slice(
            &self.committed_views(),
            Some(&Filter::equals("category.id", category_id)),
            &[SortKey::asc("id")],
            page,
        )?;
        Ok(sliced.map(|view| view.product))
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(query::count(&self.committed_views(), None)?)
    }

    fn count_by_category_name(&self, name: &str) -> RepoResult<u64> {
        Ok(query::count(
            &self.committed_views(),
            Some(&Filter::equals("category.name", name)),
        )?)
    }

    fn exists_by_name(&self, name: &str) -> RepoResult<bool> {
        Ok(query::exists(
            &self.committed_views(),
            Some(&Filter::equals("name", name)),
        )?)
    }

    fn delete_by_name(&self, tx: &mut Transaction<'_>, name: &str) -> RepoResult<u64> {
        let matched = query::select(
            &self.tx_views(tx),
            Some(&Filter::equals("name", name)),
            &[],
        )?;

        let mut removed = 0;
        for view in matched {
            let Some(id) = view.product.id else { continue };
            removed += tx.delete_product(id)?;
        }
        Ok(removed)
    }

    fn search(&self, pattern: &str, page: PageRequest) -> RepoResult<Page<Product>> {
        let filter = Filter::any(vec![
            Condition::like("name", pattern),
            Condition::like("category.name", pattern),
        ]);
        let paged = query::select_page(
            &self.committed_views(),
            Some(&filter),
            &[SortKey::asc("id")],
            page,
        )?;
        Ok(paged.map(|view| view.product))
    }

    fn set_price_by_id(
        &self,
        tx: &mut Transaction<'_>,
        id: ProductId,
        price: i64,
    ) -> RepoResult<u64> {
        let Some(mut product) = tx.read_product(id) else {
            return Ok(0);
        };
        product.price = price;
        product.validate()?;
        tx.save_product(&product)?;
        Ok(1)
    }

    fn find_first_by_id_for_update(
        &self,
        tx: &mut Transaction<'_>,
        id: ProductId,
    ) -> RepoResult<Option<Product>> {
        tx.acquire_exclusive(EntityKey::product(id))?;
        Ok(tx.read_product(id))
    }

    fn find_simple_by_name_like(&self, pattern: &str) -> RepoResult<Vec<SimpleProduct>> {
        let matched = query::select(
            &self.committed_views(),
            Some(&Filter::like("name", pattern)),
            &[SortKey::asc("id")],
        )?;
        Ok(matched
            .into_iter()
            .filter_map(|view| {
                view.product.id.map(|id| SimpleProduct {
                    id,
                    name: view.product.name,
                })
            })
            .collect())
    }

    fn find_prices_by_name_like(&self, pattern: &str) -> RepoResult<Vec<ProductPrice>> {
        let matched = query::select(
            &self.committed_views(),
            Some(&Filter::like("name", pattern)),
            &[SortKey::asc("id")],
        )?;
        Ok(matched
            .into_iter()
            .filter_map(|view| {
                view.product.id.map(|id| ProductPrice {
                    id,
                    price: view.product.price,
                })
            })
            .collect())
    }
}

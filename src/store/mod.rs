//! Storage seams: the order document store and the external cart, catalog
//! and customer collaborators.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine, CatalogProduct, OrderAggregate, OrderStatus, SubOrderStatus};
use crate::Result;

pub use memory::{MemoryCartStore, MemoryCatalog, MemoryCustomerDirectory, MemoryOrderRepository};
pub use postgres::{PgCartStore, PgCatalog, PgCustomerDirectory, PgOrderRepository};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self { Self { page: page.max(1), limit: limit.max(1) } }
    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { data: self.data.into_iter().map(f).collect(), total: self.total, page: self.page, limit: self.limit }
    }
}

/// Stores whole order aggregates; every write replaces the full document.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &OrderAggregate) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderAggregate>>;

    async fn find_by_number(&self, order_number: &str) -> Result<Option<OrderAggregate>>;

    /// Compare-and-swap on `version`. Returns the stored document with its
    /// new version, or `PersistenceConflict` when another write won.
    async fn update(&self, order: &OrderAggregate, expected_version: i64) -> Result<OrderAggregate>;

    /// Newest first.
    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>>;

    /// Orders containing a sub-order of `merchant_id`, optionally in `status`. Newest first.
    async fn list_for_merchant(
        &self,
        merchant_id: Uuid,
        status: Option<SubOrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>>;

    async fn list_all(&self, status: Option<OrderStatus>, page: PageRequest) -> Result<Paginated<OrderAggregate>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get_cart(&self, customer_id: Uuid) -> Result<Cart>;
    /// Removes the checked-out lines. Lines added after the cart was read stay.
    async fn clear_cart(&self, customer_id: Uuid, checked_out: &[CartLine]) -> Result<()>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>>;
}

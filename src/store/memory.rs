//! In-process stores, used by tests and by servers started without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartStore, Catalog, CustomerDirectory, CustomerProfile, OrderRepository, PageRequest, Paginated};
use crate::domain::aggregates::{Cart, CartLine, CatalogProduct, OrderAggregate, OrderStatus, SubOrderStatus};
use crate::{OrderError, Result};

#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, OrderAggregate>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self { Self::default() }

    pub async fn len(&self) -> usize { self.orders.read().await.len() }

    pub async fn is_empty(&self) -> bool { self.orders.read().await.is_empty() }

    async fn page_where<F>(&self, page: PageRequest, keep: F) -> Paginated<OrderAggregate>
    where
        F: Fn(&OrderAggregate) -> bool,
    {
        let orders = self.orders.read().await;
        let mut matching: Vec<&OrderAggregate> = orders.values().filter(|o| keep(o)).collect();
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Paginated { data, total, page: page.page, limit: page.limit }
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, order: &OrderAggregate) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) || orders.values().any(|o| o.order_number() == order.order_number()) {
            return Err(OrderError::Storage(format!("duplicate order {}", order.order_number())));
        }
        let mut stored = order.clone();
        stored.take_events();
        orders.insert(order.id(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderAggregate>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<OrderAggregate>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.order_number() == order_number)
            .cloned())
    }

    async fn update(&self, order: &OrderAggregate, expected_version: i64) -> Result<OrderAggregate> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id())
            .ok_or_else(|| OrderError::OrderNotFound(order.id().to_string()))?;
        if current.version() != expected_version {
            return Err(OrderError::PersistenceConflict(order.id()));
        }
        let mut stored = order.clone();
        stored.take_events();
        stored.set_version(expected_version + 1);
        orders.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>> {
        Ok(self
            .page_where(page, |o| {
                o.customer_id() == customer_id && status.map_or(true, |s| o.overall_status() == s)
            })
            .await)
    }

    async fn list_for_merchant(
        &self,
        merchant_id: Uuid,
        status: Option<SubOrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>> {
        Ok(self
            .page_where(page, |o| {
                o.sub_orders()
                    .iter()
                    .any(|s| s.merchant_id() == merchant_id && status.map_or(true, |st| s.status() == st))
            })
            .await)
    }

    async fn list_all(&self, status: Option<OrderStatus>, page: PageRequest) -> Result<Paginated<OrderAggregate>> {
        Ok(self
            .page_where(page, |o| status.map_or(true, |s| o.overall_status() == s))
            .await)
    }
}

#[derive(Default)]
pub struct MemoryCartStore {
    carts: RwLock<HashMap<Uuid, Cart>>,
}

impl MemoryCartStore {
    pub fn new() -> Self { Self::default() }

    pub async fn add_item(&self, customer_id: Uuid, line: CartLine) {
        self.carts
            .write()
            .await
            .entry(customer_id)
            .or_insert_with(|| Cart::new(customer_id))
            .add_item(line);
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get_cart(&self, customer_id: Uuid) -> Result<Cart> {
        Ok(self
            .carts
            .read()
            .await
            .get(&customer_id)
            .cloned()
            .unwrap_or_else(|| Cart::new(customer_id)))
    }

    async fn clear_cart(&self, customer_id: Uuid, checked_out: &[CartLine]) -> Result<()> {
        if let Some(cart) = self.carts.write().await.get_mut(&customer_id) {
            cart.remove_lines(checked_out);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<Uuid, CatalogProduct>>,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub async fn upsert(&self, product: CatalogProduct) {
        self.products.write().await.insert(product.id, product);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryCustomerDirectory {
    customers: RwLock<HashMap<Uuid, CustomerProfile>>,
}

impl MemoryCustomerDirectory {
    pub fn new() -> Self { Self::default() }

    pub async fn insert(&self, profile: CustomerProfile) {
        self.customers.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl CustomerDirectory for MemoryCustomerDirectory {
    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>> {
        Ok(self.customers.read().await.get(&customer_id).cloned())
    }
}

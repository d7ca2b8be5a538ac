//! PostgreSQL stores.
//!
//! An order is one row: the aggregate lives in the `document` JSONB column and
//! the columns beside it are projections used for filtering and the version
//! check. Rewriting the row is the unit of atomicity.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CartStore, Catalog, CustomerDirectory, CustomerProfile, OrderRepository, PageRequest, Paginated};
use crate::domain::aggregates::{Cart, CartLine, CatalogProduct, OrderAggregate, OrderStatus, SubOrderStatus};
use crate::{OrderError, Result};

const CUSTOMER_FILTER: &str = "customer_id = $1 AND ($2::text IS NULL OR overall_status = $2)";
const MERCHANT_FILTER: &str = "$1 = ANY(merchant_ids) AND ($2::text IS NULL OR EXISTS (\
    SELECT 1 FROM jsonb_array_elements(document->'sub_orders') AS s \
    WHERE s->>'merchant_id' = $1::text AND s->>'status' = $2))";
const STATUS_FILTER: &str = "($1::text IS NULL OR overall_status = $1)";

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    fn detached(order: &OrderAggregate) -> OrderAggregate {
        let mut stored = order.clone();
        stored.take_events();
        stored
    }
}

fn page_params(page: PageRequest) -> (i64, i64) { (i64::from(page.limit), page.offset() as i64) }

fn paginated(rows: Vec<Json<OrderAggregate>>, total: i64, page: PageRequest) -> Paginated<OrderAggregate> {
    Paginated {
        data: rows.into_iter().map(|Json(o)| o).collect(),
        total: total.max(0) as u64,
        page: page.page,
        limit: page.limit,
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &OrderAggregate) -> Result<()> {
        let stored = Self::detached(order);
        sqlx::query(
            "INSERT INTO orders (id, order_number, customer_id, overall_status, merchant_ids, version, document, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(stored.id())
        .bind(stored.order_number())
        .bind(stored.customer_id())
        .bind(stored.overall_status().as_str())
        .bind(stored.merchant_ids())
        .bind(stored.version())
        .bind(Json(&stored))
        .bind(stored.created_at())
        .bind(stored.updated_at())
        .execute(&self.pool)
        .await?;
        tracing::debug!(order_id = %stored.id(), "Inserted order document");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderAggregate>> {
        let row = sqlx::query_scalar::<_, Json<OrderAggregate>>("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(o)| o))
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<OrderAggregate>> {
        let row = sqlx::query_scalar::<_, Json<OrderAggregate>>("SELECT document FROM orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(o)| o))
    }

    async fn update(&self, order: &OrderAggregate, expected_version: i64) -> Result<OrderAggregate> {
        let mut stored = Self::detached(order);
        stored.set_version(expected_version + 1);
        let result = sqlx::query(
            "UPDATE orders SET overall_status = $2, merchant_ids = $3, version = $4, document = $5, updated_at = $6 \
             WHERE id = $1 AND version = $7",
        )
        .bind(stored.id())
        .bind(stored.overall_status().as_str())
        .bind(stored.merchant_ids())
        .bind(stored.version())
        .bind(Json(&stored))
        .bind(stored.updated_at())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = sqlx::query_scalar::<_, i64>("SELECT version FROM orders WHERE id = $1")
                .bind(stored.id())
                .fetch_optional(&self.pool)
                .await?;
            return Err(match current {
                Some(_) => OrderError::PersistenceConflict(stored.id()),
                None => OrderError::OrderNotFound(stored.id().to_string()),
            });
        }
        Ok(stored)
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>> {
        let (limit, offset) = page_params(page);
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query_scalar::<_, Json<OrderAggregate>>(&format!(
            "SELECT document FROM orders WHERE {} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            CUSTOMER_FILTER
        ))
        .bind(customer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {}", CUSTOMER_FILTER))
            .bind(customer_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(paginated(rows, total, page))
    }

    async fn list_for_merchant(
        &self,
        merchant_id: Uuid,
        status: Option<SubOrderStatus>,
        page: PageRequest,
    ) -> Result<Paginated<OrderAggregate>> {
        let (limit, offset) = page_params(page);
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query_scalar::<_, Json<OrderAggregate>>(&format!(
            "SELECT document FROM orders WHERE {} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            MERCHANT_FILTER
        ))
        .bind(merchant_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {}", MERCHANT_FILTER))
            .bind(merchant_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(paginated(rows, total, page))
    }

    async fn list_all(&self, status: Option<OrderStatus>, page: PageRequest) -> Result<Paginated<OrderAggregate>> {
        let (limit, offset) = page_params(page);
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query_scalar::<_, Json<OrderAggregate>>(&format!(
            "SELECT document FROM orders WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            STATUS_FILTER
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders WHERE {}", STATUS_FILTER))
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(paginated(rows, total, page))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    product_id: Uuid,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
}

#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn get_cart(&self, customer_id: Uuid) -> Result<Cart> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT product_id, quantity, size, color FROM cart_items WHERE customer_id = $1 ORDER BY created_at",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        let lines = rows
            .into_iter()
            .map(|r| CartLine {
                product_id: r.product_id,
                quantity: u32::try_from(r.quantity).unwrap_or(0),
                size: r.size,
                color: r.color,
            })
            .collect();
        Ok(Cart::with_items(customer_id, lines))
    }

    async fn clear_cart(&self, customer_id: Uuid, checked_out: &[CartLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for line in checked_out {
            sqlx::query(
                "DELETE FROM cart_items WHERE customer_id = $1 AND product_id = $2 \
                 AND size IS NOT DISTINCT FROM $3 AND color IS NOT DISTINCT FROM $4",
            )
            .bind(customer_id)
            .bind(line.product_id)
            .bind(line.size.as_deref())
            .bind(line.color.as_deref())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    merchant_id: Uuid,
    name: String,
    price: i64,
    images: Vec<String>,
    status: String,
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, merchant_id, name, price, images, status FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            Ok(CatalogProduct {
                id: r.id,
                merchant_id: r.merchant_id,
                name: r.name,
                // stored in minor units
                price: Decimal::new(r.price, 2),
                images: r.images,
                status: r.status.parse().map_err(OrderError::Storage)?,
            })
        })
        .transpose()
    }
}

#[derive(Clone)]
pub struct PgCustomerDirectory {
    pool: PgPool,
}

impl PgCustomerDirectory {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CustomerDirectory for PgCustomerDirectory {
    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<CustomerProfile>> {
        Ok(sqlx::query_as::<_, CustomerProfile>("SELECT id, name, email FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

/// These run against a real database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Charges, OrderInput, SubOrder, SubOrderItem};
    use crate::domain::fixtures::address;
    use crate::domain::value_objects::{Actor, PaymentMethod};
    use sqlx::postgres::PgPoolOptions;

    async fn pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Some(pool)
    }

    fn order(customer: Uuid, merchants: &[Uuid]) -> OrderAggregate {
        let actor = Actor::customer(customer);
        let subs = merchants
            .iter()
            .map(|m| {
                let items = vec![SubOrderItem::new(Uuid::new_v4(), "Pen", None, 1, Decimal::ONE, None, None)];
                SubOrder::create(*m, items, Charges::default(), &actor)
            })
            .collect();
        let input = OrderInput {
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::CashOnDelivery,
            customer_notes: None,
            special_instructions: None,
        };
        OrderAggregate::assemble(customer, input, subs, "USD").unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_versioned_update() {
        let Some(pool) = pool().await else { return };
        let repo = PgOrderRepository::new(pool);
        let placed = order(Uuid::new_v4(), &[Uuid::new_v4()]);
        repo.insert(&placed).await.unwrap();

        let saved = repo.update(&placed, placed.version()).await.unwrap();
        assert_eq!(saved.version(), placed.version() + 1);
        assert_eq!(repo.find_by_id(placed.id()).await.unwrap().unwrap().version(), saved.version());

        assert!(matches!(
            repo.update(&placed, placed.version()).await,
            Err(OrderError::PersistenceConflict(_))
        ));
        let missing = order(Uuid::new_v4(), &[Uuid::new_v4()]);
        assert!(matches!(repo.update(&missing, 1).await, Err(OrderError::OrderNotFound(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_merchant_and_customer_filters() {
        let Some(pool) = pool().await else { return };
        let repo = PgOrderRepository::new(pool);
        let (customer, merchant, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut confirmed = order(customer, &[merchant, other]);
        repo.insert(&confirmed).await.unwrap();
        repo.insert(&order(customer, &[merchant])).await.unwrap();
        repo.insert(&order(Uuid::new_v4(), &[other])).await.unwrap();

        // Only the other merchant's sub-order moves; ours stays pending.
        let sub_id = confirmed.sub_order_for_merchant(other).unwrap().sub_order_id().to_string();
        let version = confirmed.version();
        confirmed
            .update_sub_order_status(&sub_id, SubOrderStatus::Confirmed, &Actor::merchant(other), None)
            .unwrap();
        repo.update(&confirmed, version).await.unwrap();

        let page = PageRequest::new(1, 10);
        let all = repo.list_for_merchant(merchant, None, page).await.unwrap();
        assert_eq!(all.total, 2);
        let pending = repo.list_for_merchant(merchant, Some(SubOrderStatus::Pending), page).await.unwrap();
        assert_eq!(pending.total, 2);
        let ours_confirmed = repo.list_for_merchant(merchant, Some(SubOrderStatus::Confirmed), page).await.unwrap();
        assert_eq!(ours_confirmed.total, 0);
        let theirs_confirmed = repo.list_for_merchant(other, Some(SubOrderStatus::Confirmed), page).await.unwrap();
        assert_eq!(theirs_confirmed.total, 1);
        assert_eq!(theirs_confirmed.data[0].id(), confirmed.id());

        assert_eq!(repo.list_for_customer(customer, None, page).await.unwrap().total, 2);
        let pending = repo.list_for_customer(customer, Some(OrderStatus::Pending), page).await.unwrap();
        assert_eq!(pending.total, 1);
        let shipped = repo.list_for_customer(customer, Some(OrderStatus::Shipped), page).await.unwrap();
        assert_eq!(shipped.total, 0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_clear_cart_keeps_unlisted_lines() {
        let Some(pool) = pool().await else { return };
        let (customer, shirt, mug) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        for id in [shirt, mug] {
            sqlx::query("INSERT INTO products (id, merchant_id, sku, name, price, status) VALUES ($1, $2, $3, 'Item', 100, 'active')")
                .bind(id)
                .bind(Uuid::new_v4())
                .bind(id.to_string())
                .execute(&pool)
                .await
                .unwrap();
        }
        for (product, color) in [(shirt, Some("red")), (shirt, None), (mug, None)] {
            sqlx::query("INSERT INTO cart_items (id, customer_id, product_id, quantity, color) VALUES ($1, $2, $3, 1, $4)")
                .bind(Uuid::new_v4())
                .bind(customer)
                .bind(product)
                .bind(color)
                .execute(&pool)
                .await
                .unwrap();
        }

        let store = PgCartStore::new(pool);
        store
            .clear_cart(customer, &[CartLine::new(shirt, 1).with_color("red"), CartLine::new(mug, 1)])
            .await
            .unwrap();
        assert_eq!(store.get_cart(customer).await.unwrap().items(), &[CartLine::new(shirt, 1)]);
    }
}

//! Read side: customer history, order details, tracking and merchant queues.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::projections::{CustomerSummary, MerchantOrderRow, OrderTracking};
use crate::config::Config;
use crate::domain::aggregates::{OrderAggregate, OrderStatus, SubOrderStatus};
use crate::domain::value_objects::{Actor, ActorType};
use crate::store::{CustomerDirectory, CustomerProfile, OrderRepository, PageRequest, Paginated};
use crate::{OrderError, Result};

/// Default and ceiling for `limit` on list queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self { Self { default_limit: 20, max_limit: 100 } }
}

impl PageLimits {
    pub fn from_config(config: &Config) -> Self {
        Self { default_limit: config.default_page_limit, max_limit: config.max_page_limit }
    }

    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, self.max_limit.max(1));
        PageRequest::new(page.unwrap_or(1), limit)
    }
}

#[derive(Clone)]
pub struct OrderQueryService {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerDirectory>,
    limits: PageLimits,
}

impl OrderQueryService {
    pub fn new(orders: Arc<dyn OrderRepository>, customers: Arc<dyn CustomerDirectory>, limits: PageLimits) -> Self {
        Self { orders, customers, limits }
    }

    /// The customer's orders, newest first.
    pub async fn get_customer_orders(
        &self,
        customer_id: Uuid,
        status: Option<OrderStatus>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<OrderAggregate>> {
        let page = self.limits.page(page, limit);
        self.orders.list_for_customer(customer_id, status, page).await
    }

    /// Full order document, for the owning customer or an admin. Merchants
    /// read their share through `get_merchant_orders`. Anyone else gets
    /// `OrderNotFound` so the order's existence is not disclosed.
    pub async fn get_order_details(&self, order_id: Uuid, actor: &Actor) -> Result<OrderAggregate> {
        let owns = |order: &OrderAggregate| match actor.kind {
            ActorType::Admin => true,
            ActorType::Customer => order.customer_id() == actor.id,
            ActorType::Merchant => false,
        };
        match self.orders.find_by_id(order_id).await? {
            Some(order) if owns(&order) => Ok(order),
            Some(_) => {
                debug!(order_id = %order_id, actor_id = %actor.id, "Order hidden from caller");
                Err(OrderError::OrderNotFound(order_id.to_string()))
            }
            None => Err(OrderError::OrderNotFound(order_id.to_string())),
        }
    }

    pub async fn track_order(&self, order_number: &str, customer_id: Uuid) -> Result<OrderTracking> {
        self.orders
            .find_by_number(order_number)
            .await?
            .filter(|order| order.customer_id() == customer_id)
            .map(|order| OrderTracking::from(&order))
            .ok_or_else(|| OrderError::OrderNotFound(order_number.to_string()))
    }

    /// The merchant's sub-orders, each with its order and customer context.
    pub async fn get_merchant_orders(
        &self,
        merchant_id: Uuid,
        status: Option<SubOrderStatus>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<MerchantOrderRow>> {
        let page = self.limits.page(page, limit);
        let orders = self.orders.list_for_merchant(merchant_id, status, page).await?;

        let mut profiles: HashMap<Uuid, Option<CustomerProfile>> = HashMap::new();
        for order in &orders.data {
            if !profiles.contains_key(&order.customer_id()) {
                let profile = self.customers.get_customer(order.customer_id()).await?;
                profiles.insert(order.customer_id(), profile);
            }
        }

        let Paginated { data, total, page, limit } = orders;
        let rows = data
            .iter()
            .filter_map(|order| {
                let sub = order.sub_order_for_merchant(merchant_id)?;
                let profile = profiles.get(&order.customer_id()).and_then(Option::as_ref);
                let customer = CustomerSummary::new(order.customer_id(), profile);
                Some(MerchantOrderRow::new(order, sub, customer))
            })
            .collect();
        Ok(Paginated { data: rows, total, page, limit })
    }

    /// Every order, for operators.
    pub async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<OrderAggregate>> {
        let page = self.limits.page(page, limit);
        self.orders.list_all(status, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Charges, OrderInput, SubOrder, SubOrderItem};
    use crate::domain::fixtures::address;
    use crate::domain::value_objects::PaymentMethod;
    use crate::store::{MemoryCustomerDirectory, MemoryOrderRepository};
    use rust_decimal::Decimal;

    fn sub_order(merchant_id: Uuid, customer: &Actor) -> SubOrder {
        let item = SubOrderItem::new(Uuid::new_v4(), "Lamp", None, 1, Decimal::new(40, 0), None, None);
        SubOrder::create(merchant_id, vec![item], Charges::default(), customer)
    }

    fn order(customer_id: Uuid, merchants: &[Uuid]) -> OrderAggregate {
        let actor = Actor::customer(customer_id);
        let input = OrderInput {
            shipping_address: address(),
            billing_address: None,
            payment_method: PaymentMethod::CashOnDelivery,
            customer_notes: None,
            special_instructions: Some("ring twice".into()),
        };
        let subs = merchants.iter().map(|m| sub_order(*m, &actor)).collect();
        OrderAggregate::assemble(customer_id, input, subs, "USD").unwrap()
    }

    async fn service() -> (OrderQueryService, Arc<MemoryOrderRepository>, Arc<MemoryCustomerDirectory>) {
        let orders = Arc::new(MemoryOrderRepository::new());
        let customers = Arc::new(MemoryCustomerDirectory::new());
        let service = OrderQueryService::new(orders.clone(), customers.clone(), PageLimits::default());
        (service, orders, customers)
    }

    #[test]
    fn test_page_limits_clamp() {
        let limits = PageLimits { default_limit: 20, max_limit: 100 };
        assert_eq!(limits.page(None, None), PageRequest { page: 1, limit: 20 });
        assert_eq!(limits.page(Some(3), Some(500)), PageRequest { page: 3, limit: 100 });
        assert_eq!(limits.page(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
    }

    #[tokio::test]
    async fn test_customer_orders_only_their_own() {
        let (service, orders, _) = service().await;
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        for _ in 0..3 {
            orders.insert(&order(alice, &[Uuid::new_v4()])).await.unwrap();
        }
        orders.insert(&order(bob, &[Uuid::new_v4()])).await.unwrap();

        let page = service.get_customer_orders(alice, None, Some(1), Some(2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data.len(), 2);
        assert!(page.data.iter().all(|o| o.customer_id() == alice));
    }

    #[tokio::test]
    async fn test_details_hidden_from_strangers() {
        let (service, orders, _) = service().await;
        let customer = Uuid::new_v4();
        let merchant = Uuid::new_v4();
        let placed = order(customer, &[merchant]);
        orders.insert(&placed).await.unwrap();

        assert!(service.get_order_details(placed.id(), &Actor::customer(customer)).await.is_ok());
        assert!(service.get_order_details(placed.id(), &Actor::admin(Uuid::new_v4())).await.is_ok());
        assert!(matches!(
            service.get_order_details(placed.id(), &Actor::merchant(merchant)).await,
            Err(OrderError::OrderNotFound(_))
        ));
        assert!(matches!(
            service.get_order_details(placed.id(), &Actor::customer(Uuid::new_v4())).await,
            Err(OrderError::OrderNotFound(_))
        ));
        assert!(matches!(
            service.get_order_details(placed.id(), &Actor::merchant(Uuid::new_v4())).await,
            Err(OrderError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_track_order_by_number() {
        let (service, orders, _) = service().await;
        let customer = Uuid::new_v4();
        let placed = order(customer, &[Uuid::new_v4(), Uuid::new_v4()]);
        orders.insert(&placed).await.unwrap();

        let tracking = service.track_order(placed.order_number(), customer).await.unwrap();
        assert_eq!(tracking.shipments.len(), 2);
        assert_eq!(tracking.overall_status, OrderStatus::Pending);
        assert_eq!(tracking.shipments[0].items[0].name, "Lamp");
        let json = serde_json::to_value(&tracking).unwrap();
        assert_eq!(json["status_history"][0]["updated_by_type"], "customer");
        assert!(json["status_history"][0].get("updated_by").is_none());
        assert!(json["shipments"][0]["status_history"][0].get("updated_by").is_none());

        assert!(service.track_order(placed.order_number(), Uuid::new_v4()).await.is_err());
        assert!(service.track_order("ORD-0-MISSING00", customer).await.is_err());
    }

    #[tokio::test]
    async fn test_merchant_orders_join_customer() {
        let (service, orders, customers) = service().await;
        let (customer, merchant, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        customers
            .insert(CustomerProfile { id: customer, name: "Ada".into(), email: "ada@example.com".into() })
            .await;
        orders.insert(&order(customer, &[merchant, other])).await.unwrap();
        orders.insert(&order(Uuid::new_v4(), &[merchant])).await.unwrap();
        orders.insert(&order(customer, &[other])).await.unwrap();

        let page = service.get_merchant_orders(merchant, None, None, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data.len(), 2);
        let known = page.data.iter().find(|r| r.customer.id == customer).unwrap();
        assert_eq!(known.customer.email.as_deref(), Some("ada@example.com"));
        assert_eq!(known.items.len(), 1);
        assert_eq!(known.special_instructions.as_deref(), Some("ring twice"));
        let unknown = page.data.iter().find(|r| r.customer.id != customer).unwrap();
        assert!(unknown.customer.name.is_none());

        let shipped = service
            .get_merchant_orders(merchant, Some(SubOrderStatus::Shipped), None, None)
            .await
            .unwrap();
        assert_eq!(shipped.total, 0);
    }
}

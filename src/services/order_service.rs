//! Order assembly and sub-order lifecycle operations.
//!
//! Every write goes through one document replace with a version check. A
//! lost race is retried once from a fresh read before the conflict is
//! reported to the caller.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::Pricing;
use crate::domain::aggregates::{
    Cart, Charges, OrderAggregate, OrderInput, SubOrder, SubOrderItem, SubOrderStatus, TrackingInfo,
};
use crate::domain::value_objects::{Actor, PaymentStatus};
use crate::notify::{self, MerchantNotifier};
use crate::store::{CartStore, Catalog, OrderRepository};
use crate::{OrderError, Result};

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn MerchantNotifier>,
    pricing: Pricing,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn MerchantNotifier>,
        pricing: Pricing,
    ) -> Self {
        Self { orders, carts, catalog, notifier, pricing }
    }

    /// Turns the customer's cart into an order with one sub-order per merchant.
    ///
    /// The checked-out cart lines are removed and merchants are notified only
    /// after the order is stored; neither of those can undo the order.
    pub async fn create_order_from_cart(&self, customer_id: Uuid, input: OrderInput) -> Result<OrderAggregate> {
        let cart = self.carts.get_cart(customer_id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        input.shipping_address.ensure_valid()?;
        if let Some(billing) = &input.billing_address {
            billing.ensure_valid()?;
        }

        let actor = Actor::customer(customer_id);
        let sub_orders = self
            .group_by_merchant(&cart)
            .await?
            .into_iter()
            .map(|(merchant_id, items)| {
                let charges = self.charges_for(merchant_id, &items);
                SubOrder::create(merchant_id, items, charges, &actor)
            })
            .collect();

        let mut order = OrderAggregate::assemble(customer_id, input, sub_orders, &self.pricing.currency)?;
        let events = order.take_events();
        self.orders.insert(&order).await?;
        info!(
            order_id = %order.id(),
            order_number = order.order_number(),
            customer_id = %customer_id,
            merchant_count = order.merchant_count(),
            grand_total = %order.grand_total(),
            "Order created"
        );

        if let Err(e) = self.carts.clear_cart(customer_id, cart.items()).await {
            warn!(customer_id = %customer_id, order_id = %order.id(), error = %e, "Failed to clear cart after order");
        }
        notify::dispatch(self.notifier.clone(), events);
        Ok(order)
    }

    /// Resolves each cart line against the catalog and groups the price
    /// snapshots by merchant, in order of first appearance.
    async fn group_by_merchant(&self, cart: &Cart) -> Result<Vec<(Uuid, Vec<SubOrderItem>)>> {
        let mut groups: Vec<(Uuid, Vec<SubOrderItem>)> = Vec::new();
        for line in cart.items() {
            if line.quantity == 0 {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
            let product = self
                .catalog
                .get_product(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            if !product.is_purchasable() {
                return Err(OrderError::Validation(format!("product {} is not available", product.name)));
            }
            let item = product.snapshot(line);
            match groups.iter_mut().find(|(merchant, _)| *merchant == product.merchant_id) {
                Some((_, items)) => items.push(item),
                None => groups.push((product.merchant_id, vec![item])),
            }
        }
        Ok(groups)
    }

    fn charges_for(&self, merchant_id: Uuid, items: &[SubOrderItem]) -> Charges {
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();
        Charges {
            shipping: self.pricing.shipping.shipping_cost(merchant_id, subtotal, items),
            tax: self.pricing.tax.tax(merchant_id, subtotal),
            discount: Decimal::ZERO,
        }
    }

    pub async fn update_sub_order_status(
        &self,
        order_id: Uuid,
        sub_order_id: &str,
        new_status: SubOrderStatus,
        actor: Actor,
        notes: Option<String>,
    ) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "update_sub_order_status", |order| {
                order.update_sub_order_status(sub_order_id, new_status, &actor, notes.clone())
            })
            .await?;
        info!(
            order_id = %order_id,
            sub_order_id,
            status = %new_status,
            actor = %actor.kind,
            overall_status = %order.overall_status(),
            "Sub-order status updated"
        );
        Ok(order)
    }

    pub async fn add_tracking_info(
        &self,
        order_id: Uuid,
        sub_order_id: &str,
        tracking: TrackingInfo,
        actor: Actor,
    ) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "add_tracking_info", |order| {
                order.add_tracking_info(sub_order_id, tracking.clone(), &actor)
            })
            .await?;
        info!(order_id = %order_id, sub_order_id, carrier = %tracking.shipping_carrier, "Tracking attached");
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: Uuid, actor: Actor, reason: Option<String>) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "cancel_order", |order| order.cancel(&actor, reason.clone()))
            .await?;
        info!(order_id = %order_id, actor = %actor.kind, "Order cancelled");
        Ok(order)
    }

    pub async fn request_return(
        &self,
        order_id: Uuid,
        sub_order_id: &str,
        actor: Actor,
        reason: String,
    ) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "request_return", |order| {
                order.request_return(sub_order_id, reason.clone(), &actor)
            })
            .await?;
        info!(order_id = %order_id, sub_order_id, "Return requested");
        Ok(order)
    }

    /// Refunds a returned sub-order; `amount` defaults to the sub-order total.
    pub async fn process_refund(
        &self,
        order_id: Uuid,
        sub_order_id: &str,
        actor: Actor,
        amount: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "process_refund", |order| {
                order.refund(sub_order_id, amount, &actor, notes.clone()).map(|_| ())
            })
            .await?;
        info!(order_id = %order_id, sub_order_id, payment_status = ?order.payment_status(), "Refund processed");
        Ok(order)
    }

    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
        actor: Actor,
    ) -> Result<OrderAggregate> {
        let order = self
            .mutate(order_id, "update_payment_status", |order| order.set_payment_status(status, &actor))
            .await?;
        info!(order_id = %order_id, payment_status = ?status, "Payment status updated");
        Ok(order)
    }

    /// Read, apply, compare-and-swap. Retries once on a version conflict.
    async fn mutate<F>(&self, order_id: Uuid, operation: &'static str, apply: F) -> Result<OrderAggregate>
    where
        F: Fn(&mut OrderAggregate) -> Result<()> + Send + Sync,
    {
        let mut retried = false;
        loop {
            let mut order = self
                .orders
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
            let expected_version = order.version();
            if let Err(e) = apply(&mut order) {
                warn!(order_id = %order_id, operation, error = %e, "Order update rejected");
                return Err(e);
            }
            let events = order.take_events();
            match self.orders.update(&order, expected_version).await {
                Ok(saved) => {
                    notify::dispatch(self.notifier.clone(), events);
                    return Ok(saved);
                }
                Err(OrderError::PersistenceConflict(_)) if !retried => {
                    warn!(order_id = %order_id, operation, "Concurrent order update, retrying");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

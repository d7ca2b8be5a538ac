//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use super::sub_order::{SubOrder, SubOrderStatus, TrackingInfo};
use crate::domain::events::OrderEvent;
use crate::domain::status::reduce_overall_status;
use crate::domain::value_objects::{
    generate_reference, round_money, Actor, ActorType, Address, PaymentMethod, PaymentStatus, StatusChange,
};
use crate::{OrderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    ReadyToShip,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
    PartiallyConfirmed,
    PartiallyShipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::ReadyToShip => "ready_to_ship",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
            Self::PartiallyConfirmed => "partially_confirmed",
            Self::PartiallyShipped => "partially_shipped",
        }
    }
}

impl From<SubOrderStatus> for OrderStatus {
    fn from(s: SubOrderStatus) -> Self {
        match s {
            SubOrderStatus::Pending => Self::Pending,
            SubOrderStatus::Confirmed => Self::Confirmed,
            SubOrderStatus::Processing => Self::Processing,
            SubOrderStatus::ReadyToShip => Self::ReadyToShip,
            SubOrderStatus::Shipped => Self::Shipped,
            SubOrderStatus::Delivered => Self::Delivered,
            SubOrderStatus::Cancelled => Self::Cancelled,
            SubOrderStatus::Returned => Self::Returned,
            SubOrderStatus::Refunded => Self::Refunded,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Checkout details supplied by the customer
#[derive(Clone, Debug, Deserialize)]
pub struct OrderInput {
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub customer_notes: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderAggregate {
    id: Uuid,
    order_number: String,
    customer_id: Uuid,
    sub_orders: Vec<SubOrder>,
    merchant_count: usize,
    is_multi_merchant: bool,
    subtotal: Decimal,
    total_shipping: Decimal,
    total_tax: Decimal,
    total_discount: Decimal,
    grand_total: Decimal,
    currency: String,
    overall_status: OrderStatus,
    shipping_address: Address,
    billing_address: Address,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    customer_notes: Option<String>,
    special_instructions: Option<String>,
    status_history: Vec<StatusChange<OrderStatus>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
}

impl OrderAggregate {
    /// Builds a new order from per-merchant sub-orders.
    pub fn assemble(customer_id: Uuid, input: OrderInput, mut sub_orders: Vec<SubOrder>, currency: &str) -> Result<Self> {
        if sub_orders.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        input.shipping_address.ensure_valid()?;
        if let Some(billing) = &input.billing_address {
            billing.ensure_valid()?;
        }

        let mut seen = HashSet::new();
        for sub in sub_orders.iter_mut() {
            while !seen.insert(sub.sub_order_id().to_string()) {
                sub.regenerate_id();
            }
        }

        let actor = Actor::customer(customer_id);
        let now = Utc::now();
        let billing_address = input.billing_address.unwrap_or_else(|| input.shipping_address.clone());
        let mut order = Self {
            id: Uuid::now_v7(),
            order_number: generate_reference("ORD"),
            customer_id,
            sub_orders,
            merchant_count: 0,
            is_multi_merchant: false,
            subtotal: Decimal::ZERO,
            total_shipping: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            currency: currency.to_string(),
            overall_status: OrderStatus::Pending,
            shipping_address: input.shipping_address,
            billing_address,
            payment_method: input.payment_method,
            payment_status: PaymentStatus::Pending,
            customer_notes: input.customer_notes,
            special_instructions: input.special_instructions,
            status_history: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.recalculate();
        order.overall_status = reduce_overall_status(order.sub_orders.iter().map(|s| s.status()));
        order
            .status_history
            .push(StatusChange::new(order.overall_status, &actor, Some("Order placed".into())));
        for sub in &order.sub_orders {
            let event = OrderEvent::Placed {
                order_id: order.id,
                order_number: order.order_number.clone(),
                sub_order_id: sub.sub_order_id().to_string(),
                merchant_id: sub.merchant_id(),
                item_count: sub.item_count(),
                total: sub.total(),
                currency: order.currency.clone(),
            };
            order.events.push(event);
        }
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn sub_orders(&self) -> &[SubOrder] { &self.sub_orders }
    pub fn merchant_count(&self) -> usize { self.merchant_count }
    pub fn is_multi_merchant(&self) -> bool { self.is_multi_merchant }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn total_shipping(&self) -> Decimal { self.total_shipping }
    pub fn total_tax(&self) -> Decimal { self.total_tax }
    pub fn total_discount(&self) -> Decimal { self.total_discount }
    pub fn grand_total(&self) -> Decimal { self.grand_total }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn overall_status(&self) -> OrderStatus { self.overall_status }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn billing_address(&self) -> &Address { &self.billing_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn customer_notes(&self) -> Option<&str> { self.customer_notes.as_deref() }
    pub fn special_instructions(&self) -> Option<&str> { self.special_instructions.as_deref() }
    pub fn status_history(&self) -> &[StatusChange<OrderStatus>] { &self.status_history }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn merchant_ids(&self) -> Vec<Uuid> { self.sub_orders.iter().map(|s| s.merchant_id()).collect() }

    pub fn sub_order(&self, sub_order_id: &str) -> Option<&SubOrder> {
        self.sub_orders.iter().find(|s| s.sub_order_id() == sub_order_id)
    }

    pub fn sub_order_for_merchant(&self, merchant_id: Uuid) -> Option<&SubOrder> {
        self.sub_orders.iter().find(|s| s.merchant_id() == merchant_id)
    }

    /// Customers see their own orders, merchants orders they sell into.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor.kind {
            ActorType::Admin => true,
            ActorType::Customer => actor.id == self.customer_id,
            ActorType::Merchant => self.sub_order_for_merchant(actor.id).is_some(),
        }
    }

    fn ensure_access(&self, actor: &Actor) -> Result<()> {
        if self.is_visible_to(actor) {
            Ok(())
        } else {
            Err(OrderError::UnauthorizedOrderAccess(self.order_number.clone()))
        }
    }

    fn sub_order_index(&self, sub_order_id: &str) -> Result<usize> {
        self.sub_orders
            .iter()
            .position(|s| s.sub_order_id() == sub_order_id)
            .ok_or_else(|| OrderError::SubOrderNotFound(sub_order_id.to_string()))
    }

    pub fn update_sub_order_status(
        &mut self,
        sub_order_id: &str,
        next: SubOrderStatus,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<()> {
        // Returns need a reason and refunds settle payment status.
        match next {
            SubOrderStatus::Returned => {
                return self.request_return(sub_order_id, notes.unwrap_or_default(), actor);
            }
            SubOrderStatus::Refunded => return self.refund(sub_order_id, None, actor, notes).map(|_| ()),
            _ => {}
        }
        self.ensure_access(actor)?;
        let idx = self.sub_order_index(sub_order_id)?;
        let from = self.sub_orders[idx].status();
        self.sub_orders[idx].transition(next, actor, notes.clone())?;
        self.status_changed(idx, from, actor, notes);
        Ok(())
    }

    pub fn add_tracking_info(&mut self, sub_order_id: &str, tracking: TrackingInfo, actor: &Actor) -> Result<()> {
        self.ensure_access(actor)?;
        let idx = self.sub_order_index(sub_order_id)?;
        let from = self.sub_orders[idx].status();
        let notes = Some(format!("Shipped via {}", tracking.shipping_carrier));
        let shipped = self.sub_orders[idx].attach_tracking(tracking, actor, notes.clone())?;
        let sub = &self.sub_orders[idx];
        let event = OrderEvent::TrackingAttached {
            order_id: self.id,
            order_number: self.order_number.clone(),
            sub_order_id: sub.sub_order_id().to_string(),
            merchant_id: sub.merchant_id(),
            tracking_number: sub.tracking_number().unwrap_or_default().to_string(),
            shipping_carrier: sub.shipping_carrier().unwrap_or_default().to_string(),
        };
        self.raise_event(event);
        if shipped {
            self.status_changed(idx, from, actor, notes);
        } else {
            self.touch();
        }
        Ok(())
    }

    /// Cancels every open sub-order. Fails without changes if any sub-order
    /// has progressed past the customer-cancellable states.
    pub fn cancel(&mut self, actor: &Actor, reason: Option<String>) -> Result<()> {
        self.ensure_access(actor)?;
        let open: Vec<usize> = self
            .sub_orders
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.status().is_terminal())
            .map(|(i, _)| i)
            .collect();
        if open.is_empty() {
            return Err(OrderError::InvalidTransition {
                from: SubOrderStatus::Cancelled,
                to: SubOrderStatus::Cancelled,
            });
        }
        for &idx in &open {
            let sub = &self.sub_orders[idx];
            if !sub.status().is_customer_cancellable() {
                return Err(OrderError::InvalidTransition { from: sub.status(), to: SubOrderStatus::Cancelled });
            }
            sub.authorize(SubOrderStatus::Cancelled, actor)?;
        }
        for idx in open {
            let from = self.sub_orders[idx].status();
            self.sub_orders[idx].transition(SubOrderStatus::Cancelled, actor, reason.clone())?;
            self.status_changed(idx, from, actor, reason.clone());
        }
        Ok(())
    }

    pub fn request_return(&mut self, sub_order_id: &str, reason: String, actor: &Actor) -> Result<()> {
        self.ensure_access(actor)?;
        let idx = self.sub_order_index(sub_order_id)?;
        let from = self.sub_orders[idx].status();
        self.sub_orders[idx].request_return(reason.clone(), actor)?;
        self.status_changed(idx, from, actor, Some(reason));
        Ok(())
    }

    pub fn refund(
        &mut self,
        sub_order_id: &str,
        amount: Option<Decimal>,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<Decimal> {
        self.ensure_access(actor)?;
        let idx = self.sub_order_index(sub_order_id)?;
        let from = self.sub_orders[idx].status();
        let refunded = self.sub_orders[idx].refund(amount, actor, notes.clone())?;
        self.status_changed(idx, from, actor, notes);
        self.payment_status = if self.sub_orders.iter().all(|s| s.status() == SubOrderStatus::Refunded) {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        Ok(refunded)
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus, actor: &Actor) -> Result<()> {
        if !actor.is_admin() {
            return Err(OrderError::UnauthorizedOrderAccess(self.order_number.clone()));
        }
        self.payment_status = status;
        self.touch();
        Ok(())
    }

    fn status_changed(&mut self, idx: usize, from: SubOrderStatus, actor: &Actor, notes: Option<String>) {
        let sub = &self.sub_orders[idx];
        let event = OrderEvent::SubOrderStatusChanged {
            order_id: self.id,
            order_number: self.order_number.clone(),
            sub_order_id: sub.sub_order_id().to_string(),
            merchant_id: sub.merchant_id(),
            from,
            to: sub.status(),
            actor_type: actor.kind,
            notes: notes.clone(),
        };
        self.raise_event(event);
        self.refresh_status(actor, notes);
        self.touch();
    }

    /// Re-runs the reducer; appends history only when the result changes.
    fn refresh_status(&mut self, actor: &Actor, notes: Option<String>) {
        let next = reduce_overall_status(self.sub_orders.iter().map(|s| s.status()));
        if next != self.overall_status {
            self.overall_status = next;
            self.status_history.push(StatusChange::new(next, actor, notes));
        }
    }

    fn recalculate(&mut self) {
        self.subtotal = self.sub_orders.iter().map(|s| s.subtotal()).sum();
        self.total_shipping = self.sub_orders.iter().map(|s| s.shipping_cost()).sum();
        self.total_tax = self.sub_orders.iter().map(|s| s.tax()).sum();
        self.total_discount = self.sub_orders.iter().map(|s| s.discount()).sum();
        self.grand_total =
            round_money(self.subtotal + self.total_shipping + self.total_tax - self.total_discount);
        self.merchant_count = self.sub_orders.len();
        self.is_multi_merchant = self.merchant_count > 1;
    }

    pub fn totals_consistent(&self) -> bool {
        self.grand_total == round_money(self.subtotal + self.total_shipping + self.total_tax - self.total_discount)
            && self.merchant_count == self.sub_orders.len()
            && self.is_multi_merchant == (self.merchant_count > 1)
            && self.sub_orders.iter().all(|s| s.totals_consistent() && !s.status_history().is_empty())
    }

    pub(crate) fn set_version(&mut self, version: i64) { self.version = version; }
    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

//! Sub-Order: one merchant's share of an order and its fulfilment lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{generate_reference, round_money, Actor, ActorType, StatusChange};
use crate::{OrderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOrderStatus {
    Pending,
    Confirmed,
    Processing,
    ReadyToShip,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl SubOrderStatus {
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
        }
    }

    /// Transition table. Cancellation is open until the parcel ships.
    pub fn can_transition_to(self, next: SubOrderStatus) -> bool {
        use SubOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Processing)
                | (Processing, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Returned)
                | (Returned, Refunded)
                | (Pending | Confirmed | Processing | ReadyToShip, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool { matches!(self, Self::Cancelled | Self::Refunded) }

    /// States a customer may still cancel from.
    pub fn is_customer_cancellable(self) -> bool { matches!(self, Self::Pending | Self::Confirmed) }
}

impl fmt::Display for SubOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Requested,
    Refunded,
}

/// Order line with the price captured at checkout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubOrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub line_total: Decimal,
}

impl SubOrderItem {
    pub fn new(
        product_id: Uuid,
        name: impl Into<String>,
        image: Option<String>,
        quantity: u32,
        unit_price: Decimal,
        size: Option<String>,
        color: Option<String>,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            image,
            quantity,
            unit_price,
            size,
            color,
            line_total: round_money(unit_price * Decimal::from(quantity)),
        }
    }
}

/// Charges computed by the pricing policies for one merchant group
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Charges {
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct TrackingInfo {
    #[validate(length(min = 1, message = "tracking_number is required"))]
    pub tracking_number: String,
    #[validate(length(min = 1, message = "shipping_carrier is required"))]
    pub shipping_carrier: String,
    pub shipping_method: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubOrder {
    sub_order_id: String,
    merchant_id: Uuid,
    items: Vec<SubOrderItem>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    status: SubOrderStatus,
    tracking_number: Option<String>,
    shipping_carrier: Option<String>,
    shipping_method: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    actual_delivery: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    return_status: Option<ReturnStatus>,
    return_reason: Option<String>,
    refund_amount: Option<Decimal>,
    status_history: Vec<StatusChange<SubOrderStatus>>,
}

impl SubOrder {
    pub fn create(merchant_id: Uuid, items: Vec<SubOrderItem>, charges: Charges, created_by: &Actor) -> Self {
        let subtotal = items.iter().fold(Decimal::ZERO, |acc, i| acc + i.line_total);
        let total = round_money(subtotal + charges.shipping + charges.tax - charges.discount);
        Self {
            sub_order_id: generate_reference("SUB"),
            merchant_id,
            items,
            subtotal,
            shipping_cost: charges.shipping,
            tax: charges.tax,
            discount: charges.discount,
            total,
            status: SubOrderStatus::Pending,
            tracking_number: None,
            shipping_carrier: None,
            shipping_method: None,
            estimated_delivery: None,
            actual_delivery: None,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            return_status: None,
            return_reason: None,
            refund_amount: None,
            status_history: vec![StatusChange::new(
                SubOrderStatus::Pending,
                created_by,
                Some("Order placed".into()),
            )],
        }
    }

    pub fn sub_order_id(&self) -> &str { &self.sub_order_id }
    pub fn merchant_id(&self) -> Uuid { self.merchant_id }
    pub fn items(&self) -> &[SubOrderItem] { &self.items }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn shipping_cost(&self) -> Decimal { self.shipping_cost }
    pub fn tax(&self) -> Decimal { self.tax }
    pub fn discount(&self) -> Decimal { self.discount }
    pub fn total(&self) -> Decimal { self.total }
    pub fn status(&self) -> SubOrderStatus { self.status }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn shipping_carrier(&self) -> Option<&str> { self.shipping_carrier.as_deref() }
    pub fn shipping_method(&self) -> Option<&str> { self.shipping_method.as_deref() }
    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> { self.estimated_delivery }
    pub fn actual_delivery(&self) -> Option<DateTime<Utc>> { self.actual_delivery }
    pub fn shipped_at(&self) -> Option<DateTime<Utc>> { self.shipped_at }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> { self.cancelled_at }
    pub fn cancellation_reason(&self) -> Option<&str> { self.cancellation_reason.as_deref() }
    pub fn return_status(&self) -> Option<ReturnStatus> { self.return_status }
    pub fn return_reason(&self) -> Option<&str> { self.return_reason.as_deref() }
    pub fn refund_amount(&self) -> Option<Decimal> { self.refund_amount }
    pub fn status_history(&self) -> &[StatusChange<SubOrderStatus>] { &self.status_history }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    pub(crate) fn regenerate_id(&mut self) { self.sub_order_id = generate_reference("SUB"); }

    /// Checks ownership, the transition table and what the actor's role may request.
    pub fn authorize(&self, next: SubOrderStatus, actor: &Actor) -> Result<()> {
        if actor.kind == ActorType::Merchant && actor.id != self.merchant_id {
            return Err(OrderError::UnauthorizedOrderAccess(self.sub_order_id.clone()));
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let permitted = match actor.kind {
            ActorType::Admin => true,
            ActorType::Merchant => next != SubOrderStatus::Returned,
            ActorType::Customer => match next {
                SubOrderStatus::Cancelled => self.status.is_customer_cancellable(),
                SubOrderStatus::Returned => true,
                _ => false,
            },
        };
        if !permitted {
            return Err(OrderError::UnauthorizedOrderAccess(self.sub_order_id.clone()));
        }
        Ok(())
    }

    pub(crate) fn transition(&mut self, next: SubOrderStatus, actor: &Actor, notes: Option<String>) -> Result<()> {
        self.authorize(next, actor)?;
        self.apply(next, actor, notes);
        Ok(())
    }

    /// Caller has already run `authorize`.
    fn apply(&mut self, next: SubOrderStatus, actor: &Actor, notes: Option<String>) {
        let now = Utc::now();
        match next {
            SubOrderStatus::Confirmed => self.confirmed_at = Some(now),
            SubOrderStatus::Shipped => self.shipped_at = Some(now),
            SubOrderStatus::Delivered => {
                self.delivered_at = Some(now);
                self.actual_delivery = Some(now);
            }
            SubOrderStatus::Cancelled => {
                self.cancelled_at = Some(now);
                self.cancellation_reason = notes.clone();
            }
            SubOrderStatus::Returned => {
                self.return_status = Some(ReturnStatus::Requested);
                if self.return_reason.is_none() {
                    self.return_reason = notes.clone();
                }
            }
            SubOrderStatus::Refunded => {
                self.return_status = Some(ReturnStatus::Refunded);
                self.refund_amount.get_or_insert(self.total);
            }
            SubOrderStatus::Pending | SubOrderStatus::Processing | SubOrderStatus::ReadyToShip => {}
        }
        self.status = next;
        self.status_history.push(StatusChange::new(next, actor, notes));
    }

    /// Records carrier details. Moves `ready_to_ship` to `shipped`; on an
    /// already shipped sub-order only the tracking fields change.
    pub(crate) fn attach_tracking(&mut self, tracking: TrackingInfo, actor: &Actor, notes: Option<String>) -> Result<bool> {
        tracking
            .validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;
        let ships_now = self.status != SubOrderStatus::Shipped;
        if ships_now {
            self.authorize(SubOrderStatus::Shipped, actor)?;
        } else if actor.kind == ActorType::Merchant && actor.id != self.merchant_id {
            return Err(OrderError::UnauthorizedOrderAccess(self.sub_order_id.clone()));
        } else if actor.kind == ActorType::Customer {
            return Err(OrderError::UnauthorizedOrderAccess(self.sub_order_id.clone()));
        }
        self.tracking_number = Some(tracking.tracking_number);
        self.shipping_carrier = Some(tracking.shipping_carrier);
        self.shipping_method = tracking.shipping_method;
        self.estimated_delivery = tracking.estimated_delivery;
        if ships_now {
            self.apply(SubOrderStatus::Shipped, actor, notes);
        }
        Ok(ships_now)
    }

    pub(crate) fn request_return(&mut self, reason: String, actor: &Actor) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(OrderError::Validation("return reason is required".into()));
        }
        self.authorize(SubOrderStatus::Returned, actor)?;
        self.return_reason = Some(reason.clone());
        self.apply(SubOrderStatus::Returned, actor, Some(reason));
        Ok(())
    }

    /// Refunds `amount`, or the full sub-order total when absent.
    pub(crate) fn refund(&mut self, amount: Option<Decimal>, actor: &Actor, notes: Option<String>) -> Result<Decimal> {
        let amount = round_money(amount.unwrap_or(self.total));
        if amount <= Decimal::ZERO || amount > self.total {
            return Err(OrderError::Validation(format!(
                "refund amount {} must be positive and at most {}",
                amount, self.total
            )));
        }
        self.authorize(SubOrderStatus::Refunded, actor)?;
        self.refund_amount = Some(amount);
        self.apply(SubOrderStatus::Refunded, actor, notes);
        Ok(amount)
    }

    pub fn totals_consistent(&self) -> bool {
        let items_ok = self
            .items
            .iter()
            .all(|i| i.line_total == round_money(i.unit_price * Decimal::from(i.quantity)));
        let subtotal: Decimal = self.items.iter().map(|i| i.line_total).sum();
        items_ok
            && subtotal == self.subtotal
            && self.total == round_money(self.subtotal + self.shipping_cost + self.tax - self.discount)
    }
}

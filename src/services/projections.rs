//! Read models handed to customers and merchants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{
    OrderAggregate, OrderStatus, ReturnStatus, SubOrder, SubOrderItem, SubOrderStatus,
};
use crate::domain::value_objects::{ActorType, Address, PaymentMethod, PaymentStatus, StatusChange};
use crate::store::CustomerProfile;

/// Customer-facing shipment view of one order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTracking {
    pub order_number: String,
    pub overall_status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipping_address: Address,
    pub status_history: Vec<TrackedStatus<OrderStatus>>,
    pub shipments: Vec<SubOrderTracking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubOrderTracking {
    pub sub_order_id: String,
    pub status: SubOrderStatus,
    pub items: Vec<TrackedItem>,
    pub tracking_number: Option<String>,
    pub shipping_carrier: Option<String>,
    pub shipping_method: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub status_history: Vec<TrackedStatus<SubOrderStatus>>,
}

/// History entry without the identity of whoever made the change.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedStatus<S> {
    pub status: S,
    pub timestamp: DateTime<Utc>,
    pub updated_by_type: ActorType,
    pub notes: Option<String>,
}

impl<S: Copy> From<&StatusChange<S>> for TrackedStatus<S> {
    fn from(change: &StatusChange<S>) -> Self {
        Self {
            status: change.status,
            timestamp: change.timestamp,
            updated_by_type: change.updated_by_type,
            notes: change.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedItem {
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
}

impl From<&OrderAggregate> for OrderTracking {
    fn from(order: &OrderAggregate) -> Self {
        Self {
            order_number: order.order_number().to_string(),
            overall_status: order.overall_status(),
            placed_at: order.created_at(),
            updated_at: order.updated_at(),
            shipping_address: order.shipping_address().clone(),
            status_history: order.status_history().iter().map(TrackedStatus::from).collect(),
            shipments: order.sub_orders().iter().map(SubOrderTracking::from).collect(),
        }
    }
}

impl From<&SubOrder> for SubOrderTracking {
    fn from(sub: &SubOrder) -> Self {
        Self {
            sub_order_id: sub.sub_order_id().to_string(),
            status: sub.status(),
            items: sub
                .items()
                .iter()
                .map(|i| TrackedItem { name: i.name.clone(), image: i.image.clone(), quantity: i.quantity })
                .collect(),
            tracking_number: sub.tracking_number().map(str::to_string),
            shipping_carrier: sub.shipping_carrier().map(str::to_string),
            shipping_method: sub.shipping_method().map(str::to_string),
            estimated_delivery: sub.estimated_delivery(),
            shipped_at: sub.shipped_at(),
            delivered_at: sub.delivered_at(),
            status_history: sub.status_history().iter().map(TrackedStatus::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CustomerSummary {
    pub fn new(id: Uuid, profile: Option<&CustomerProfile>) -> Self {
        Self {
            id,
            name: profile.map(|p| p.name.clone()),
            email: profile.map(|p| p.email.clone()),
        }
    }
}

/// One merchant's sub-order with the order context needed to fulfil it.
#[derive(Debug, Clone, Serialize)]
pub struct MerchantOrderRow {
    pub order_id: Uuid,
    pub order_number: String,
    pub placed_at: DateTime<Utc>,
    pub customer: CustomerSummary,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub customer_notes: Option<String>,
    pub special_instructions: Option<String>,
    pub sub_order_id: String,
    pub status: SubOrderStatus,
    pub items: Vec<SubOrderItem>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub tracking_number: Option<String>,
    pub shipping_carrier: Option<String>,
    pub return_status: Option<ReturnStatus>,
    pub return_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
}

impl MerchantOrderRow {
    pub fn new(order: &OrderAggregate, sub: &SubOrder, customer: CustomerSummary) -> Self {
        Self {
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            placed_at: order.created_at(),
            customer,
            shipping_address: order.shipping_address().clone(),
            payment_method: order.payment_method(),
            payment_status: order.payment_status(),
            customer_notes: order.customer_notes().map(str::to_string),
            special_instructions: order.special_instructions().map(str::to_string),
            sub_order_id: sub.sub_order_id().to_string(),
            status: sub.status(),
            items: sub.items().to_vec(),
            subtotal: sub.subtotal(),
            shipping_cost: sub.shipping_cost(),
            tax: sub.tax(),
            discount: sub.discount(),
            total: sub.total(),
            currency: order.currency().to_string(),
            tracking_number: sub.tracking_number().map(str::to_string),
            shipping_carrier: sub.shipping_carrier().map(str::to_string),
            return_status: sub.return_status(),
            return_reason: sub.return_reason().map(str::to_string),
            refund_amount: sub.refund_amount(),
        }
    }
}

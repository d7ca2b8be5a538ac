//! Domain events raised by the order aggregate and fanned out to merchants
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::SubOrderStatus;
use crate::domain::value_objects::ActorType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        order_number: String,
        sub_order_id: String,
        merchant_id: Uuid,
        item_count: u32,
        total: Decimal,
        currency: String,
    },
    SubOrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        sub_order_id: String,
        merchant_id: Uuid,
        from: SubOrderStatus,
        to: SubOrderStatus,
        actor_type: ActorType,
        notes: Option<String>,
    },
    TrackingAttached {
        order_id: Uuid,
        order_number: String,
        sub_order_id: String,
        merchant_id: Uuid,
        tracking_number: String,
        shipping_carrier: String,
    },
}

impl OrderEvent {
    /// Merchant whose sub-order the event concerns.
    pub fn merchant_id(&self) -> Uuid {
        match self {
            Self::Placed { merchant_id, .. }
            | Self::SubOrderStatusChanged { merchant_id, .. }
            | Self::TrackingAttached { merchant_id, .. } => *merchant_id,
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            Self::Placed { order_id, .. }
            | Self::SubOrderStatusChanged { order_id, .. }
            | Self::TrackingAttached { order_id, .. } => *order_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "order_placed",
            Self::SubOrderStatusChanged { .. } => "sub_order_status_changed",
            Self::TrackingAttached { .. } => "tracking_attached",
        }
    }
}

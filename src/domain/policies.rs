//! Pluggable shipping and tax pricing.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::SubOrderItem;
use crate::domain::value_objects::round_money;

/// Shipping charged for one merchant's parcel.
pub trait ShippingPolicy: Send + Sync {
    fn shipping_cost(&self, merchant_id: Uuid, subtotal: Decimal, items: &[SubOrderItem]) -> Decimal;
}

/// Tax charged on one merchant's subtotal.
pub trait TaxPolicy: Send + Sync {
    fn tax(&self, merchant_id: Uuid, subtotal: Decimal) -> Decimal;
}

#[derive(Clone, Debug)]
pub struct FlatRateShipping {
    rate: Decimal,
    free_over: Option<Decimal>,
}

impl FlatRateShipping {
    pub fn new(rate: Decimal) -> Self { Self { rate, free_over: None } }

    /// Waives shipping once the subtotal reaches `threshold`.
    pub fn free_over(mut self, threshold: Decimal) -> Self {
        self.free_over = Some(threshold);
        self
    }
}

impl ShippingPolicy for FlatRateShipping {
    fn shipping_cost(&self, _merchant_id: Uuid, subtotal: Decimal, _items: &[SubOrderItem]) -> Decimal {
        match self.free_over {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => round_money(self.rate),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PercentageTax {
    rate: Decimal,
}

impl PercentageTax {
    pub fn new(rate: Decimal) -> Self { Self { rate } }
}

impl TaxPolicy for PercentageTax {
    fn tax(&self, _merchant_id: Uuid, subtotal: Decimal) -> Decimal { round_money(subtotal * self.rate) }
}

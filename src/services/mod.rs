//! Application services over the order aggregate.
pub mod order_service;
pub mod projections;
pub mod query_service;

use std::sync::Arc;

use crate::config::Config;
use crate::domain::policies::{FlatRateShipping, PercentageTax, ShippingPolicy, TaxPolicy};

pub use order_service::OrderService;
pub use projections::{CustomerSummary, MerchantOrderRow, OrderTracking, SubOrderTracking, TrackedItem, TrackedStatus};
pub use query_service::{OrderQueryService, PageLimits};

/// Shipping and tax policies applied per merchant group at checkout
#[derive(Clone)]
pub struct Pricing {
    pub shipping: Arc<dyn ShippingPolicy>,
    pub tax: Arc<dyn TaxPolicy>,
    pub currency: String,
}

impl Pricing {
    pub fn from_config(config: &Config) -> Self {
        let mut shipping = FlatRateShipping::new(config.flat_shipping_rate);
        if let Some(threshold) = config.free_shipping_threshold {
            shipping = shipping.free_over(threshold);
        }
        Self {
            shipping: Arc::new(shipping),
            tax: Arc::new(PercentageTax::new(config.tax_rate)),
            currency: config.currency.clone(),
        }
    }
}

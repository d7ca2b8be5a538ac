//! Catalog product as seen by checkout

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::sub_order::SubOrderItem;
use super::cart::CartLine;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub status: ProductStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown product status: {}", other)),
        }
    }
}

impl CatalogProduct {
    pub fn is_purchasable(&self) -> bool { self.status == ProductStatus::Active }
    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }

    /// Copies the current price and name into an order line.
    pub fn snapshot(&self, line: &CartLine) -> SubOrderItem {
        SubOrderItem::new(
            self.id,
            self.name.clone(),
            self.primary_image().map(str::to_string),
            line.quantity,
            self.price,
            line.size.clone(),
            line.color.clone(),
        )
    }
}

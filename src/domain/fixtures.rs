//! Shared builders for unit tests.
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{CatalogProduct, ProductStatus};
use crate::domain::value_objects::Address;

pub(crate) fn address() -> Address {
    Address {
        full_name: "Ada Lovelace".into(),
        phone: "5550101234".into(),
        address_line1: "12 Analytical Way".into(),
        address_line2: None,
        city: "London".into(),
        state: "LDN".into(),
        postal_code: "N1 9GU".into(),
        country: "GB".into(),
    }
}

pub(crate) fn product(merchant_id: Uuid, name: &str, price: Decimal) -> CatalogProduct {
    CatalogProduct {
        id: Uuid::new_v4(),
        merchant_id,
        name: name.into(),
        price,
        images: vec![format!("https://cdn.example.com/{}.jpg", name.to_lowercase())],
        status: ProductStatus::Active,
    }
}

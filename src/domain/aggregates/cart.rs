//! Cart Aggregate
//!
//! The cart only records what the customer picked. Prices and owning
//! merchants are resolved against the catalog at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    customer_id: Uuid,
    items: Vec<CartLine>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartLine {
    pub fn new(product_id: Uuid, quantity: u32) -> Self {
        Self { product_id, quantity, size: None, color: None }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self { self.size = Some(size.into()); self }
    pub fn with_color(mut self, color: impl Into<String>) -> Self { self.color = Some(color.into()); self }

    fn same_variant(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id && self.size == other.size && self.color == other.color
    }
}

impl Cart {
    pub fn new(customer_id: Uuid) -> Self {
        Self { customer_id, items: vec![], updated_at: Utc::now() }
    }

    pub fn with_items(customer_id: Uuid, items: Vec<CartLine>) -> Self {
        Self { customer_id, items, updated_at: Utc::now() }
    }

    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartLine) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_variant(&item)) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        self.touch();
    }

    /// Drops the lines matching the given variants; anything else stays.
    pub fn remove_lines(&mut self, lines: &[CartLine]) {
        self.items.retain(|i| !lines.iter().any(|l| l.same_variant(i)));
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_merges_same_variant() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartLine::new(product, 2).with_size("M"));
        cart.add_item(CartLine::new(product, 1).with_size("M"));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        cart.add_item(CartLine::new(product, 1).with_size("L"));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_remove_lines_keeps_others() {
        let (shirt, mug) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::with_items(
            Uuid::new_v4(),
            vec![
                CartLine::new(shirt, 1).with_color("red"),
                CartLine::new(shirt, 1).with_color("blue"),
                CartLine::new(mug, 2),
            ],
        );
        cart.remove_lines(&[CartLine::new(shirt, 1).with_color("red"), CartLine::new(mug, 2)]);
        assert_eq!(cart.items(), &[CartLine::new(shirt, 1).with_color("blue")]);
    }
}

//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod sub_order;

pub use cart::{Cart, CartLine};
pub use order::{OrderAggregate, OrderInput, OrderStatus};
pub use product::{CatalogProduct, ProductStatus};
pub use sub_order::{Charges, ReturnStatus, SubOrder, SubOrderItem, SubOrderStatus, TrackingInfo};

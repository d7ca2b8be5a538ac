//! Marketplace Orders
//!
//! Order service for a multi-merchant storefront.
//!
//! ## Features
//! - Cart checkout split into one sub-order per merchant
//! - Per-merchant fulfilment lifecycle with an enforced transition table
//! - Overall order status derived from the sub-order statuses
//! - Customer, merchant and admin read projections
//! - Optimistic concurrency on the order document

pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod services;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::SubOrderStatus;

pub use crate::config::Config;
pub use crate::domain::aggregates::{OrderAggregate, OrderStatus, SubOrder};
pub use crate::services::{OrderQueryService, OrderService};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Sub-order not found: {0}")]
    SubOrderNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: SubOrderStatus,
        to: SubOrderStatus,
    },

    #[error("Not allowed to access order {0}")]
    UnauthorizedOrderAccess(String),

    #[error("Order {0} was modified concurrently")]
    PersistenceConflict(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        OrderError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(e: serde_json::Error) -> Self {
        OrderError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;

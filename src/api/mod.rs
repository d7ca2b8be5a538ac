//! HTTP surface.

pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::services::{OrderQueryService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub queries: OrderQueryService,
}

pub fn router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/orders", get(list_my_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/track/:order_number", get(track_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/sub-orders/:sub_order_id/status", put(update_sub_order_status))
        .route("/api/v1/orders/:id/sub-orders/:sub_order_id/tracking", put(add_tracking))
        .route("/api/v1/orders/:id/sub-orders/:sub_order_id/return", post(request_return))
        .route("/api/v1/orders/:id/sub-orders/:sub_order_id/refund", post(process_refund))
        .route("/api/v1/merchant/orders", get(list_merchant_orders))
        .route("/api/v1/admin/orders", get(list_all_orders))
        .route("/api/v1/admin/orders/:id/payment-status", put(update_payment_status))
        .with_state(state)
}

//! HTTP mapping for `OrderError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::OrderError;

impl OrderError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::EmptyCart => "empty_cart",
            OrderError::InvalidAddress(_) => "invalid_address",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::SubOrderNotFound(_) => "sub_order_not_found",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::UnauthorizedOrderAccess(_) => "unauthorized_order_access",
            OrderError::PersistenceConflict(_) => "persistence_conflict",
            OrderError::ProductNotFound(_) => "product_not_found",
            OrderError::Validation(_) => "validation_failed",
            OrderError::Unauthenticated => "unauthenticated",
            OrderError::Storage(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::EmptyCart | OrderError::InvalidAddress(_) | OrderError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            OrderError::Unauthenticated => StatusCode::UNAUTHORIZED,
            OrderError::UnauthorizedOrderAccess(_) => StatusCode::FORBIDDEN,
            OrderError::OrderNotFound(_) | OrderError::SubOrderNotFound(_) | OrderError::ProductNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OrderError::PersistenceConflict(_) => StatusCode::CONFLICT,
            OrderError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            OrderError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": self.code(), "message": message }))).into_response()
    }
}

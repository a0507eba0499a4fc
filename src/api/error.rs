use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogError;
use crate::domain::order::OrderError;
use crate::store::StoreError;

// ============================================================================
// API Errors - every failure leaves as {"error": {"code", "message"}}
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed path, query or body
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn storage_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Order(err) => match err {
                OrderError::Validation(_) | OrderError::InvalidTransition { .. } => {
                    (StatusCode::BAD_REQUEST, err.code())
                }
                OrderError::Forbidden(_) => (StatusCode::FORBIDDEN, err.code()),
                OrderError::NotFound(_) | OrderError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.code()),
                OrderError::AlreadyInState { .. }
                | OrderError::InsufficientStock { .. }
                | OrderError::Conflict(_) => (StatusCode::CONFLICT, err.code()),
                OrderError::Storage(store) => storage_status(store),
                OrderError::AlreadyPlaced(_) | OrderError::NotInitialized => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
                OrderError::AmountOverflow => (StatusCode::INTERNAL_SERVER_ERROR, err.code()),
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidPriceRange { .. } | CatalogError::InvalidPage => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                CatalogError::Storage(store) => storage_status(store),
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, code) = self.status_and_code();

        // Storage internals stay in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed on the server side");
            "The service could not complete the request".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            error: ErrorDetail { code: code.to_string(), message },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use uuid::Uuid;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().status_code()
    }

    #[test]
    fn test_order_errors_map_to_distinct_statuses() {
        let id = Uuid::new_v4();

        assert_eq!(status_of(OrderError::Validation("empty".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled,
                reason: "delivered orders cannot be cancelled",
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(OrderError::Forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(OrderError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(OrderError::ProductNotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(OrderError::AlreadyInState { status: OrderStatus::Shipped }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::InsufficientStock { product_id: id, requested: 3, available: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(OrderError::Conflict(id)), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_errors() {
        let unavailable = OrderError::Storage(StoreError::Unavailable("timeout".into()));
        let corrupt = OrderError::Storage(StoreError::Corrupt { id: Uuid::new_v4(), reason: "bad json".into() });

        assert_eq!(status_of(unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(corrupt), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(OrderError::AmountOverflow), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(CatalogError::InvalidPage), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_error_body_shape() {
        let response = ApiError::from(OrderError::Forbidden("admin role required")).error_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "FORBIDDEN");
        assert!(body.error.message.contains("admin role required"));
    }
}

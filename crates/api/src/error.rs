//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CheckoutError, OrderError};
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller's identity header is missing.
    Unauthorized(String),
    /// Error raised by a fulfillment service.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::Checkout(checkout_err) => match checkout_err {
            CheckoutError::Validation { .. } | CheckoutError::MixedStores { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            CheckoutError::ProductUnavailable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            CheckoutError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        },
        FulfillmentError::Order(order_err) => match order_err {
            OrderError::TrackingCodeRequired => (StatusCode::BAD_REQUEST, err.to_string()),
            OrderError::InvalidStateTransition { .. } | OrderError::DuplicateGatewayEvent { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
        },
        // Another seller's order is reported as missing.
        FulfillmentError::OrderNotFound(id) | FulfillmentError::NotOrderOwner { order_id: id, .. } => {
            (StatusCode::NOT_FOUND, format!("Order not found: {id}"))
        }
        FulfillmentError::RateProvider { message } => {
            tracing::error!(error = %message, "rate provider failed");
            (
                StatusCode::BAD_GATEWAY,
                "Shipping rates are unavailable, please try again later".to_string(),
            )
        }
        FulfillmentError::InvalidSignature => (StatusCode::UNAUTHORIZED, err.to_string()),
        FulfillmentError::MalformedNotification(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        FulfillmentError::Contention(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        FulfillmentError::Store(store_err) => {
            tracing::error!(error = %store_err, "store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{OrderStatus, ProductId, StoreId};

    fn status_of(err: FulfillmentError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_checkout_errors() {
        assert_eq!(
            status_of(CheckoutError::validation("items", "must not be empty").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                CheckoutError::ProductUnavailable {
                    product_id: ProductId::from("P1")
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(
                CheckoutError::InsufficientStock {
                    product_id: ProductId::from("P1"),
                    requested: 3,
                    available: 1,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_order_errors() {
        assert_eq!(
            status_of(
                OrderError::InvalidStateTransition {
                    current_state: OrderStatus::Pending,
                    action: "ship",
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FulfillmentError::NotOrderOwner {
                order_id: OrderId::new(),
                store_id: StoreId::new("store-b"),
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_infrastructure_errors() {
        assert_eq!(
            status_of(FulfillmentError::RateProvider {
                message: "timeout".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(FulfillmentError::Store(StoreError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(FulfillmentError::InvalidSignature),
            StatusCode::UNAUTHORIZED
        );
    }
}

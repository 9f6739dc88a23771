//! HTTP route handlers.

pub mod checkout;
pub mod health;
pub mod orders;
pub mod shipping;
pub mod webhooks;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use common::OrderId;
use domain::{BuyerId, StoreId};

use crate::error::ApiError;

/// Header carrying the authenticated buyer, set by the upstream gateway.
pub const BUYER_ID_HEADER: &str = "x-buyer-id";

/// Header carrying the authenticated seller's store.
pub const STORE_ID_HEADER: &str = "x-store-id";

/// Header carrying the payment gateway's body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// JSON request body whose rejections answer with the `{"error": ...}`
/// envelope like every other failure.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub(crate) fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn buyer_id(headers: &HeaderMap) -> Result<BuyerId, ApiError> {
    header_value(headers, BUYER_ID_HEADER)
        .map(BuyerId::new)
        .ok_or_else(|| ApiError::Unauthorized("X-Buyer-Id header is required".to_string()))
}

pub(crate) fn store_id(headers: &HeaderMap) -> Result<StoreId, ApiError> {
    header_value(headers, STORE_ID_HEADER)
        .map(StoreId::new)
        .ok_or_else(|| ApiError::Unauthorized("X-Store-Id header is required".to_string()))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e: common::ParseOrderIdError| ApiError::BadRequest(e.to_string()))
}

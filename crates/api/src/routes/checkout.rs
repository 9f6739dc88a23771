//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use domain::{ChosenShipping, DeliveryAddress, LineItem};
use fulfillment::CheckoutRequest;
use serde::Deserialize;

use super::{JsonBody, buyer_id};
use super::orders::OrderResponse;
use crate::error::ApiError;
use crate::{AppState, AppStore};

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub items: Vec<LineItem>,
    pub shipping_address: DeliveryAddress,
    pub shipping: ChosenShipping,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// POST /checkout: place an order for the buyer in `X-Buyer-Id`.
#[tracing::instrument(skip(state, headers, body), fields(items = body.items.len()))]
pub async fn place<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<CheckoutBody>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let buyer_id = buyer_id(&headers)?;

    let order = state
        .checkout
        .place_order(CheckoutRequest {
            buyer_id,
            items: body.items,
            shipping_address: body.shipping_address,
            shipping: body.shipping,
            promo_code: body.promo_code,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

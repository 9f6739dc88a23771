//! Shipping rate endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{LineItem, ShippingQuote, StoreId};
use fulfillment::RateInquiry;
use serde::{Deserialize, Serialize};

use super::JsonBody;
use crate::error::ApiError;
use crate::{AppState, AppStore};

#[derive(Deserialize)]
pub struct RatesRequest {
    pub store_id: String,
    pub destination_postal_code: String,
    pub items: Vec<LineItem>,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    /// Display label, e.g. `"JNE REG"`; sent back as `shipping.courier` at
    /// checkout.
    pub label: String,
    pub courier_code: String,
    pub courier_service_code: String,
    pub courier_name: String,
    pub courier_service_name: String,
    pub duration: String,
    pub price: i64,
}

#[derive(Serialize)]
pub struct RatesResponse {
    pub quotes: Vec<QuoteResponse>,
}

impl From<ShippingQuote> for QuoteResponse {
    fn from(quote: ShippingQuote) -> Self {
        Self {
            label: quote.label(),
            price: quote.price.minor_units(),
            courier_code: quote.courier_code,
            courier_service_code: quote.courier_service_code,
            courier_name: quote.courier_name,
            courier_service_name: quote.courier_service_name,
            duration: quote.duration,
        }
    }
}

/// POST /shipping/rates: courier quotes for a cart.
#[tracing::instrument(skip(state, req), fields(store_id = %req.store_id))]
pub async fn rates<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<RatesRequest>,
) -> Result<Json<RatesResponse>, ApiError> {
    if req.store_id.trim().is_empty() {
        return Err(ApiError::BadRequest("store_id is required".to_string()));
    }

    let quotes = state
        .rates
        .quotes(RateInquiry {
            store_id: StoreId::new(req.store_id.trim()),
            destination_postal_code: req.destination_postal_code,
            items: req.items,
        })
        .await?;

    Ok(Json(RatesResponse {
        quotes: quotes.into_iter().map(QuoteResponse::from).collect(),
    }))
}

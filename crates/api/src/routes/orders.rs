//! Order lookup and seller action endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use domain::{Order, ShippingAddress};
use serde::{Deserialize, Serialize};
use store::OrderStatusChange;

use super::{JsonBody, parse_order_id, store_id};
use crate::error::ApiError;
use crate::{AppState, AppStore};

// -- Request types --

#[derive(Deserialize)]
pub struct TrackingRequest {
    pub tracking_code: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub store_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub items_total: i64,
    pub shipping_cost: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub shipping_address: ShippingAddress,
    pub shipment: ShipmentResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub subtotal: i64,
}

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub courier: String,
    pub tracking_code: Option<String>,
    pub status: &'static str,
    pub estimated_delivery: String,
}

#[derive(Serialize)]
pub struct StatusChangeResponse {
    pub event_type: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub tracking_code: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let shipment = order.shipment();
        Self {
            id: order.id().to_string(),
            buyer_id: order.buyer_id().to_string(),
            store_id: order.store_id().to_string(),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.minor_units(),
                    subtotal: item.subtotal().minor_units(),
                })
                .collect(),
            items_total: order.items_total().minor_units(),
            shipping_cost: order.shipping_address().shipping_cost.minor_units(),
            discount_amount: order.discount_amount().minor_units(),
            total_amount: order.total_amount().minor_units(),
            shipping_address: order.shipping_address().clone(),
            shipment: ShipmentResponse {
                courier: shipment.courier.clone(),
                tracking_code: shipment.tracking_code.clone(),
                status: shipment.status.as_str(),
                estimated_delivery: shipment.estimated_delivery.clone(),
            },
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

impl From<OrderStatusChange> for StatusChangeResponse {
    fn from(change: OrderStatusChange) -> Self {
        Self {
            event_type: change.event_type,
            from_status: change.from_status.map(|s| s.to_string()),
            to_status: change.to_status.to_string(),
            tracking_code: change.tracking_code,
            recorded_at: change.recorded_at,
        }
    }
}

// -- Handlers --

/// GET /orders/:id: an order with its items and shipment.
#[tracing::instrument(skip(state))]
pub async fn get<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/:id/history: the order's status changes, oldest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChangeResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let changes = state.store.history(order_id).await?;
    if changes.is_empty() {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }

    Ok(Json(
        changes.into_iter().map(StatusChangeResponse::from).collect(),
    ))
}

/// POST /orders/:id/processing: seller starts packing a paid order.
#[tracing::instrument(skip(state, headers))]
pub async fn processing<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let store_id = store_id(&headers)?;
    let order_id = parse_order_id(&id)?;
    let order = state.tracker.start_processing(&store_id, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/:id/tracking: seller submits the courier tracking code,
/// which ships the order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn tracking<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<TrackingRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let store_id = store_id(&headers)?;
    let order_id = parse_order_id(&id)?;
    let order = state
        .tracker
        .submit_tracking(&store_id, order_id, &req.tracking_code)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/delivered: seller confirms the buyer received it.
#[tracing::instrument(skip(state, headers))]
pub async fn delivered<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let store_id = store_id(&headers)?;
    let order_id = parse_order_id(&id)?;
    let order = state.tracker.confirm_delivery(&store_id, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

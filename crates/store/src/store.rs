use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    CatalogSnapshot, Order, OrderEvent, OrderStatus, ProductId, SellerShippingSettings, StoreId,
};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One row of an order's audit trail.
///
/// Written for the placement, every applied transition, and every tracking
/// code write. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub order_id: OrderId,
    pub event_type: String,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub gateway_event_id: Option<String>,
    pub tracking_code: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl OrderStatusChange {
    /// Describes `event` moving an order out of `from_status`.
    pub fn from_event(
        order_id: OrderId,
        from_status: Option<OrderStatus>,
        event: &OrderEvent,
    ) -> Self {
        let to_status = event
            .target_status()
            .or(from_status)
            .unwrap_or(OrderStatus::Pending);
        Self {
            order_id,
            event_type: event.event_type().to_string(),
            from_status,
            to_status,
            gateway_event_id: event.gateway_event_id().map(str::to_string),
            tracking_code: event.tracking_code().map(str::to_string),
            recorded_at: event.occurred_at(),
        }
    }
}

/// Read-only access to the product catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Reads the listed products. Ids that do not exist are omitted.
    ///
    /// The snapshot may be stale by the time it is used; only the stock
    /// ledger guarantees stock.
    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot>;

    /// Returns the seller's shipping settings, if any were saved.
    async fn shipping_settings(&self, store_id: &StoreId)
    -> Result<Option<SellerShippingSettings>>;
}

/// Atomic stock decrements.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Decrements stock by `quantity` if at least that much remains.
    ///
    /// Fails with `InsufficientStock` and leaves stock unchanged otherwise.
    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()>;
}

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists a freshly placed order together with its items and the stock
    /// decrements for every item.
    ///
    /// All of it happens in one atomic unit: if any decrement fails nothing
    /// is written and `InsufficientStock` is returned.
    async fn place_order(&self, order: &Order) -> Result<()>;

    /// Loads an order with its items and shipment.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Persists `order` after `event` moved it out of `from`, provided the
    /// stored version still equals `expected_version`.
    ///
    /// Returns `ConcurrencyConflict` when another writer updated the order
    /// first, so a decision made on a stale copy never overwrites it.
    async fn save_transition(
        &self,
        order: &Order,
        from: OrderStatus,
        expected_version: i64,
        event: &OrderEvent,
    ) -> Result<()>;

    /// Stores the id of a gateway notification that was acknowledged without
    /// a status change, provided the stored version still equals
    /// `expected_version`. Bumps the version.
    async fn record_gateway_event(
        &self,
        order_id: OrderId,
        expected_version: i64,
        gateway_event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Returns the audit trail of an order, oldest first.
    async fn history(&self, order_id: OrderId) -> Result<Vec<OrderStatusChange>>;
}

/// Sums requested quantities per product, sorted by product id.
///
/// Decrements run in this order so concurrent checkouts lock rows
/// consistently.
pub(crate) fn quantities_by_product(order: &Order) -> Vec<(ProductId, u32)> {
    let mut totals: Vec<(ProductId, u32)> = Vec::with_capacity(order.items().len());
    for item in order.items() {
        match totals.iter_mut().find(|(id, _)| id == &item.product_id) {
            Some((_, qty)) => *qty += item.quantity,
            None => totals.push((item.product_id.clone(), item.quantity)),
        }
    }
    totals.sort_by(|a, b| a.0.cmp(&b.0));
    totals
}

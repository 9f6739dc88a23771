//! Seller-side order actions: processing, tracking codes, shipping and
//! delivery.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderError, OrderEvent, OrderStatus, StoreId};
use store::{OrderRepository, StoreError};

use crate::error::{FulfillmentError, Result};

const MAX_ATTEMPTS: usize = 3;

/// Applies seller actions to orders.
pub struct ShipmentTracker<S> {
    store: S,
}

impl<S: OrderRepository> ShipmentTracker<S> {
    /// Creates a new shipment tracker.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Moves a paid order to processing.
    #[tracing::instrument(skip(self))]
    pub async fn start_processing(&self, store_id: &StoreId, order_id: OrderId) -> Result<Order> {
        self.act(store_id, order_id, |order, now| order.start_processing(now))
            .await
    }

    /// Stores a tracking code without changing the status.
    #[tracing::instrument(skip(self))]
    pub async fn record_tracking(
        &self,
        store_id: &StoreId,
        order_id: OrderId,
        tracking_code: &str,
    ) -> Result<Order> {
        self.act(store_id, order_id, |order, now| {
            order.record_tracking(tracking_code, now)
        })
        .await
    }

    /// Marks an order with a recorded tracking code as shipped.
    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, store_id: &StoreId, order_id: OrderId) -> Result<Order> {
        self.act(store_id, order_id, |order, now| order.ship(now)).await
    }

    /// Records the tracking code, then ships the order.
    ///
    /// On an order that already shipped only the code is updated.
    #[tracing::instrument(skip(self))]
    pub async fn submit_tracking(
        &self,
        store_id: &StoreId,
        order_id: OrderId,
        tracking_code: &str,
    ) -> Result<Order> {
        let order = self.record_tracking(store_id, order_id, tracking_code).await?;
        if order.status() == OrderStatus::Shipped {
            return Ok(order);
        }
        self.ship(store_id, order_id).await
    }

    /// Confirms the buyer received a shipped order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivery(&self, store_id: &StoreId, order_id: OrderId) -> Result<Order> {
        self.act(store_id, order_id, |order, now| order.confirm_delivery(now))
            .await
    }

    /// Loads the order, checks ownership, asks the order for an event and
    /// persists it conditionally on the version it was decided against.
    async fn act<F>(&self, store_id: &StoreId, order_id: OrderId, decide: F) -> Result<Order>
    where
        F: Fn(&Order, DateTime<Utc>) -> std::result::Result<OrderEvent, OrderError>,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or(FulfillmentError::OrderNotFound(order_id))?;
            if !order.belongs_to(store_id) {
                return Err(FulfillmentError::NotOrderOwner {
                    order_id,
                    store_id: store_id.clone(),
                });
            }

            let expected = order.status();
            let expected_version = order.version();
            let event = decide(&order, Utc::now())?;
            order.apply(&event);

            match self.store.save_transition(&order, expected, expected_version, &event).await {
                Ok(()) => {
                    tracing::info!(
                        %order_id,
                        event = event.event_type(),
                        from = %expected,
                        to = %order.status(),
                        "seller action applied"
                    );
                    return Ok(order);
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    tracing::debug!(%order_id, attempt, "order changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FulfillmentError::Contention(order_id))
    }
}

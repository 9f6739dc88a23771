use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    CatalogSnapshot, Money, Order, OrderEvent, OrderStatus, Product, ProductId,
    SellerShippingSettings, StoreId,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{CatalogReader, OrderRepository, OrderStatusChange, StockLedger, quantities_by_product},
};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    settings: HashMap<StoreId, SellerShippingSettings>,
    orders: HashMap<OrderId, Order>,
    history: Vec<OrderStatusChange>,
}

/// In-memory store implementation for tests and local runs.
///
/// Every atomic unit holds the single write lock for its whole duration,
/// which gives the same guarantees as the PostgreSQL conditional updates.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn upsert_product(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Changes a product's catalog price.
    pub async fn set_price(&self, product_id: &ProductId, price: Money) {
        if let Some(product) = self.state.write().await.products.get_mut(product_id) {
            product.price = price;
        }
    }

    /// Saves a seller's shipping settings.
    pub async fn set_shipping_settings(&self, settings: SellerShippingSettings) {
        self.state
            .write()
            .await
            .settings
            .insert(settings.store_id.clone(), settings);
    }

    /// Returns a product as currently stored.
    pub async fn product(&self, product_id: &ProductId) -> Option<Product> {
        self.state.read().await.products.get(product_id).cloned()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes every operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogReader for InMemoryStore {
    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(CatalogSnapshot::from_products(
            product_ids
                .iter()
                .filter_map(|id| state.products.get(id).cloned()),
        ))
    }

    async fn shipping_settings(
        &self,
        store_id: &StoreId,
    ) -> Result<Option<SellerShippingSettings>> {
        self.check_available()?;
        Ok(self.state.read().await.settings.get(store_id).cloned())
    }
}

#[async_trait]
impl StockLedger for InMemoryStore {
    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        match state.products.get_mut(product_id) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                Ok(())
            }
            _ => {
                metrics::counter!("stock_decrement_rejected").increment(1);
                Err(StoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: quantity,
                })
            }
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn place_order(&self, order: &Order) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let decrements = quantities_by_product(order);

        // Check every decrement before touching anything.
        for (product_id, quantity) in &decrements {
            let available = state.products.get(product_id).map_or(0, |p| p.stock);
            if available < *quantity {
                metrics::counter!("stock_decrement_rejected").increment(1);
                tracing::debug!(%product_id, quantity, available, "stock decrement rejected");
                return Err(StoreError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: *quantity,
                });
            }
        }

        for (product_id, quantity) in &decrements {
            if let Some(product) = state.products.get_mut(product_id) {
                product.stock -= quantity;
            }
        }

        state.history.push(OrderStatusChange::from_event(
            order.id(),
            None,
            &order.placed_event(),
        ));
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn save_transition(
        &self,
        order: &Order,
        from: OrderStatus,
        expected_version: i64,
        event: &OrderEvent,
    ) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let order_id = order.id();

        let stored = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        if stored.version() != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected_version,
            });
        }
        *stored = order.clone();

        state
            .history
            .push(OrderStatusChange::from_event(order_id, Some(from), event));
        Ok(())
    }

    async fn record_gateway_event(
        &self,
        order_id: OrderId,
        expected_version: i64,
        gateway_event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        if stored.version() != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                order_id,
                expected_version,
            });
        }
        stored.remember_gateway_event(gateway_event_id, at);
        Ok(())
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<OrderStatusChange>> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|change| change.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::order::GatewayEventData;
    use domain::{BuyerId, ChosenShipping, DeliveryAddress, LineItem, validate_cart};

    fn product(id: &str, stock: u32) -> Product {
        Product::active(id, "store-a", format!("Product {id}"), Money::from_minor(15000), stock, 500)
    }

    async fn order_for(store: &InMemoryStore, lines: &[LineItem]) -> Order {
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id.clone()).collect();
        let snapshot = store.snapshot(&ids).await.unwrap();
        let cart = validate_cart(lines, &snapshot).unwrap();
        Order::place(
            OrderId::new(),
            BuyerId::new("buyer-1"),
            cart,
            DeliveryAddress {
                name: "Siti".to_string(),
                phone: "0812".to_string(),
                street: "Jl. Merdeka 1".to_string(),
                city: None,
                province: None,
                postal_code: None,
            },
            ChosenShipping {
                courier: "JNE REG".to_string(),
                cost: Money::from_minor(9000),
                duration: "2-3 days".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_omits_missing_products() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 5)).await;

        let snapshot = store
            .snapshot(&[ProductId::from("P1"), ProductId::from("missing")])
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 3)).await;

        store.decrement_stock(&"P1".into(), 2).await.unwrap();
        let result = store.decrement_stock(&"P1".into(), 2).await;
        assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));
        assert_eq!(store.product(&"P1".into()).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_place_order_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 5)).await;
        store.upsert_product(product("P2", 2)).await;

        let order = order_for(&store, &[LineItem::new("P1", 2), LineItem::new("P2", 2)]).await;

        // Another buyer takes P2 between validation and placement.
        store.decrement_stock(&"P2".into(), 1).await.unwrap();

        let result = store.place_order(&order).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { ref product_id, .. }) if product_id.as_str() == "P2"
        ));
        assert_eq!(store.product(&"P1".into()).await.unwrap().stock, 5);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_save_transition_is_conditional() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 5)).await;
        let order = order_for(&store, &[LineItem::new("P1", 1)]).await;
        store.place_order(&order).await.unwrap();

        let mut updated = order.clone();
        let event = OrderEvent::ProcessingStarted(domain::order::SellerActionData { at: Utc::now() });
        updated.apply(&event);

        let result = store
            .save_transition(&updated, OrderStatus::Paid, order.version() + 1, &event)
            .await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));

        let history = store.history(order.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type, "OrderPlaced");
    }

    #[tokio::test]
    async fn test_stale_copy_cannot_overwrite_newer_write() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 5)).await;
        let order = order_for(&store, &[LineItem::new("P1", 1)]).await;
        store.place_order(&order).await.unwrap();

        let mut paid = order.clone();
        let confirmed = OrderEvent::PaymentConfirmed(GatewayEventData {
            gateway_event_id: "tx-1:settlement".to_string(),
            transaction_status: "settlement".to_string(),
            received_at: Utc::now(),
        });
        paid.apply(&confirmed);
        store
            .save_transition(&paid, OrderStatus::Pending, order.version(), &confirmed)
            .await
            .unwrap();

        // The reconciler loads the paid order...
        let stale = store.get_order(order.id()).await.unwrap().unwrap();

        // ...the seller records a tracking code without moving the status...
        let mut tracked = stale.clone();
        let recorded = tracked.record_tracking("JNE123", Utc::now()).unwrap();
        tracked.apply(&recorded);
        store
            .save_transition(&tracked, OrderStatus::Paid, stale.version(), &recorded)
            .await
            .unwrap();

        // ...and the refund decided on the stale copy must not erase it.
        let mut refunded = stale.clone();
        let refund = OrderEvent::PaymentRefunded(GatewayEventData {
            gateway_event_id: "tx-1:refund".to_string(),
            transaction_status: "refund".to_string(),
            received_at: Utc::now(),
        });
        refunded.apply(&refund);
        let result = store
            .save_transition(&refunded, OrderStatus::Paid, stale.version(), &refund)
            .await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));

        let stored = store.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Paid);
        assert_eq!(stored.shipment().tracking_code.as_deref(), Some("JNE123"));
    }

    #[tokio::test]
    async fn test_record_gateway_event_bumps_version() {
        let store = InMemoryStore::new();
        store.upsert_product(product("P1", 5)).await;
        let order = order_for(&store, &[LineItem::new("P1", 1)]).await;
        store.place_order(&order).await.unwrap();

        store
            .record_gateway_event(order.id(), order.version(), "tx-1:pending", Utc::now())
            .await
            .unwrap();
        let result = store
            .record_gateway_event(order.id(), order.version(), "tx-1:pending", Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));

        let stored = store.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.version(), order.version() + 1);
        assert_eq!(stored.last_gateway_event_id(), Some("tx-1:pending"));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get_order(OrderId::new()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}

//! Checkout: turns a buyer's cart into a persisted pending order.

use chrono::Utc;
use common::OrderId;
use domain::{
    BuyerId, CheckoutError, ChosenShipping, DeliveryAddress, LineItem, Order, ProductId,
    validate_cart, validate_line_items,
};
use store::{CatalogReader, OrderRepository, StoreError};

use crate::error::{FulfillmentError, Result};

/// Everything the buyer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer_id: BuyerId,
    pub items: Vec<LineItem>,
    pub shipping_address: DeliveryAddress,
    /// The quote the buyer picked from the shipping options.
    pub shipping: ChosenShipping,
    /// Accepted but not redeemed; discounts are always zero.
    pub promo_code: Option<String>,
}

/// Assembles and persists orders.
pub struct CheckoutService<S> {
    store: S,
}

impl<S> CheckoutService<S>
where
    S: CatalogReader + OrderRepository,
{
    /// Creates a new checkout service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order.
    ///
    /// The payload is checked before the catalog is read. The order, its
    /// items and every stock decrement are persisted as one unit; if stock
    /// ran out since the catalog read nothing is written.
    #[tracing::instrument(skip(self, request), fields(buyer_id = %request.buyer_id, items = request.items.len()))]
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<Order> {
        metrics::counter!("checkout_total").increment(1);
        let start = std::time::Instant::now();

        let result = self.assemble(request).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => tracing::info!(
                order_id = %order.id(),
                store_id = %order.store_id(),
                total = order.total_amount().minor_units(),
                "order placed"
            ),
            Err(e) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::info!(error = %e, "checkout rejected");
            }
        }
        result
    }

    async fn assemble(&self, request: CheckoutRequest) -> Result<Order> {
        if request.buyer_id.as_str().trim().is_empty() {
            return Err(CheckoutError::validation("buyer_id", "is required").into());
        }
        validate_line_items(&request.items)?;
        request.shipping_address.validate()?;
        request.shipping.validate()?;

        if let Some(code) = request.promo_code.as_deref().map(str::trim)
            && !code.is_empty()
        {
            tracing::info!(promo_code = code, "promo code received, discounts are not applied");
        }

        let ids: Vec<ProductId> = request.items.iter().map(|l| l.product_id.clone()).collect();
        let snapshot = self.store.snapshot(&ids).await?;
        let cart = validate_cart(&request.items, &snapshot)?;

        let order = Order::place(
            OrderId::new(),
            request.buyer_id,
            cart,
            request.shipping_address,
            request.shipping,
            Utc::now(),
        )?;

        match self.store.place_order(&order).await {
            Ok(()) => Ok(order),
            Err(StoreError::InsufficientStock {
                product_id,
                requested,
            }) => {
                tracing::warn!(%product_id, requested, "stock ran out during checkout");
                let available = self.available_stock(&product_id).await;
                Err(CheckoutError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                }
                .into())
            }
            Err(e) => Err(FulfillmentError::Store(e)),
        }
    }

    async fn available_stock(&self, product_id: &ProductId) -> u32 {
        match self.store.snapshot(std::slice::from_ref(product_id)).await {
            Ok(snapshot) => snapshot.get(product_id).map_or(0, |p| p.stock),
            Err(e) => {
                tracing::warn!(error = %e, "could not re-read stock");
                0
            }
        }
    }
}

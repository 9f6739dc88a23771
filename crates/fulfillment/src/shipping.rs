//! Shipping rate aggregation.

use std::sync::Arc;

use domain::{LineItem, ProductId, ShippingQuote, StoreId, validate_cart};
use store::CatalogReader;

use crate::error::{FulfillmentError, Result};
use crate::services::{RateItem, RateProvider, RateRequest};

/// Fallbacks used when a seller has not configured shipping.
#[derive(Debug, Clone)]
pub struct ShippingDefaults {
    pub origin_postal_code: String,
    pub couriers: Vec<String>,
}

impl Default for ShippingDefaults {
    fn default() -> Self {
        Self {
            origin_postal_code: "10110".to_string(),
            couriers: vec!["jne".to_string(), "jnt".to_string(), "sicepat".to_string()],
        }
    }
}

/// A buyer's request for shipping options.
#[derive(Debug, Clone)]
pub struct RateInquiry {
    pub store_id: StoreId,
    pub destination_postal_code: String,
    pub items: Vec<LineItem>,
}

/// Fetches courier quotes for a cart and narrows them to what the seller
/// ships with.
pub struct ShippingRateAggregator<C: CatalogReader> {
    catalog: C,
    provider: Arc<dyn RateProvider>,
    defaults: ShippingDefaults,
}

impl<C: CatalogReader> ShippingRateAggregator<C> {
    /// Creates a new aggregator.
    pub fn new(catalog: C, provider: Arc<dyn RateProvider>, defaults: ShippingDefaults) -> Self {
        Self {
            catalog,
            provider,
            defaults,
        }
    }

    /// Returns the quotes for the inquiry, unordered.
    ///
    /// Only couriers the seller enabled are returned, even if the provider
    /// answers with more.
    #[tracing::instrument(skip(self, inquiry), fields(store_id = %inquiry.store_id))]
    pub async fn quotes(&self, inquiry: RateInquiry) -> Result<Vec<ShippingQuote>> {
        let destination = inquiry.destination_postal_code.trim();
        if destination.is_empty() {
            return Err(domain::CheckoutError::validation(
                "destination_postal_code",
                "is required",
            )
            .into());
        }

        let ids: Vec<ProductId> = inquiry.items.iter().map(|l| l.product_id.clone()).collect();
        let snapshot = self.catalog.snapshot(&ids).await?;
        let cart = validate_cart(&inquiry.items, &snapshot)?;
        if cart.store_id != inquiry.store_id {
            return Err(domain::CheckoutError::validation(
                "store_id",
                format!("items belong to store {}", cart.store_id),
            )
            .into());
        }

        let settings = self.catalog.shipping_settings(&inquiry.store_id).await?;
        let origin = settings
            .as_ref()
            .and_then(|s| s.origin_postal_code.as_deref())
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(self.defaults.origin_postal_code.as_str())
            .to_string();
        let enabled = enabled_couriers(
            settings
                .as_ref()
                .map(|s| s.enabled_couriers.as_slice())
                .unwrap_or_default(),
            &self.defaults.couriers,
        );
        if enabled.is_empty() {
            return Ok(Vec::new());
        }

        let request = RateRequest {
            origin_postal_code: origin,
            destination_postal_code: destination.to_string(),
            couriers: enabled.join(","),
            items: vec![RateItem {
                name: parcel_name(&cart.items),
                weight: cart.weight_gram,
                quantity: 1,
                value: cart.items_total.minor_units(),
            }],
        };

        metrics::counter!("rate_quotes_total").increment(1);
        let quotes = self.provider.quote(&request).await.inspect_err(|e| {
            metrics::counter!("rate_provider_errors").increment(1);
            if let FulfillmentError::RateProvider { message } = e {
                tracing::warn!(upstream = %message, "rate provider failed");
            }
        })?;

        let offered = quotes.len();
        let quotes: Vec<ShippingQuote> = quotes
            .into_iter()
            .filter(|q| enabled.contains(&q.courier_code.trim().to_lowercase()))
            .collect();
        tracing::debug!(offered, kept = quotes.len(), "rate quotes filtered");
        Ok(quotes)
    }
}

/// Normalised courier codes: the seller's list when it has one, the
/// defaults otherwise. Deduplicated, order kept.
fn enabled_couriers(seller: &[String], defaults: &[String]) -> Vec<String> {
    let source = if seller.iter().any(|c| !c.trim().is_empty()) {
        seller
    } else {
        defaults
    };

    let mut codes: Vec<String> = Vec::with_capacity(source.len());
    for code in source {
        let code = code.trim().to_lowercase();
        if !code.is_empty() && !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

fn parcel_name(items: &[domain::OrderItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} x{}", item.product_name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

//! Pricing and stock validation for a buyer's cart.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSnapshot;
use crate::error::CheckoutError;
use crate::order::OrderItem;
use crate::shipping::shipment_weight;
use crate::value_objects::{Money, ProductId, StoreId};

/// A product and quantity requested by the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A cart whose prices have been frozen against a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    /// The single store every item belongs to.
    pub store_id: StoreId,

    /// Items in request order, with unit prices copied from the snapshot.
    pub items: Vec<OrderItem>,

    /// Sum of item subtotals.
    pub items_total: Money,

    /// Billable shipment weight (floored).
    pub weight_gram: u32,
}

/// Checks the shape of the requested line items before the catalog is read.
///
/// Rejects an empty cart, zero quantities, and the same product listed twice.
pub fn validate_line_items(lines: &[LineItem]) -> Result<(), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::validation("items", "must not be empty"));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.product_id.as_str().trim().is_empty() {
            return Err(CheckoutError::validation(
                format!("items[{index}].product_id"),
                "is required",
            ));
        }
        if line.quantity == 0 {
            return Err(CheckoutError::validation(
                format!("items[{index}].quantity"),
                "must be at least 1",
            ));
        }
        if !seen.insert(&line.product_id) {
            return Err(CheckoutError::validation(
                format!("items[{index}].product_id"),
                format!("product {} is listed more than once", line.product_id),
            ));
        }
    }

    Ok(())
}

/// Validates a cart against a catalog snapshot and freezes its prices.
///
/// A single missing, inactive, or understocked product rejects the whole
/// cart; no partial result is ever returned.
pub fn validate_cart(
    lines: &[LineItem],
    snapshot: &CatalogSnapshot,
) -> Result<PricedCart, CheckoutError> {
    validate_line_items(lines)?;

    let mut found = Vec::with_capacity(lines.len());
    for line in lines {
        match snapshot.get(&line.product_id) {
            Some(product) if product.status.is_purchasable() => found.push((line, product)),
            _ => {
                return Err(CheckoutError::ProductUnavailable {
                    product_id: line.product_id.clone(),
                });
            }
        }
    }

    // Every line must have matched a distinct product.
    let distinct: HashSet<_> = found.iter().map(|(_, p)| &p.id).collect();
    if distinct.len() != lines.len() {
        let missing = lines
            .iter()
            .find(|line| !distinct.contains(&line.product_id))
            .map(|line| line.product_id.clone())
            .unwrap_or_else(|| lines[0].product_id.clone());
        return Err(CheckoutError::ProductUnavailable {
            product_id: missing,
        });
    }

    let store_id = found[0].1.store_id.clone();
    if let Some((_, other)) = found.iter().find(|(_, p)| p.store_id != store_id) {
        return Err(CheckoutError::MixedStores {
            first: store_id,
            other: other.store_id.clone(),
        });
    }

    for (line, product) in &found {
        if line.quantity > product.stock {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id.clone(),
                requested: line.quantity,
                available: product.stock,
            });
        }
    }

    let mut items: Vec<OrderItem> = Vec::with_capacity(found.len());
    let mut items_total = Money::zero();
    for (index, (line, product)) in found.iter().enumerate() {
        items_total = product
            .price
            .checked_multiply(line.quantity)
            .and_then(|subtotal| items_total.checked_add(subtotal))
            .ok_or_else(|| {
                CheckoutError::validation(
                    format!("items[{index}].quantity"),
                    "order amount is too large",
                )
            })?;
        items.push(OrderItem::new(
            product.id.clone(),
            product.name.clone(),
            line.quantity,
            product.price,
        ));
    }
    let weight_gram = shipment_weight(
        found
            .iter()
            .map(|(line, product)| (product.weight_gram, line.quantity)),
    );

    Ok(PricedCart {
        store_id,
        items,
        items_total,
        weight_gram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Product, ProductStatus};

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::from_products(vec![
            Product::active("P1", "store-a", "Batik Shirt", Money::from_minor(15000), 5, 500),
            Product::active("P2", "store-a", "Sarong", Money::from_minor(40000), 1, 300),
            Product::active("P3", "store-a", "Scarf", Money::from_minor(25000), 10, 0)
                .with_status(ProductStatus::Archived),
            Product::active("Q1", "store-b", "Coffee", Money::from_minor(60000), 9, 250),
        ])
    }

    #[test]
    fn test_prices_are_frozen_from_snapshot() {
        let cart = validate_cart(&[LineItem::new("P1", 2)], &snapshot()).unwrap();

        assert_eq!(cart.store_id, StoreId::new("store-a"));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].unit_price, Money::from_minor(15000));
        assert_eq!(cart.items[0].subtotal(), Money::from_minor(30000));
        assert_eq!(cart.items_total, Money::from_minor(30000));
        assert_eq!(cart.weight_gram, 1000);
    }

    #[test]
    fn test_missing_product_rejects_whole_cart() {
        let result = validate_cart(
            &[LineItem::new("P1", 1), LineItem::new("NOPE", 1)],
            &snapshot(),
        );
        assert_eq!(
            result,
            Err(CheckoutError::ProductUnavailable {
                product_id: ProductId::new("NOPE")
            })
        );
    }

    #[test]
    fn test_inactive_product_is_unavailable() {
        let result = validate_cart(&[LineItem::new("P3", 1)], &snapshot());
        assert!(matches!(
            result,
            Err(CheckoutError::ProductUnavailable { product_id }) if product_id.as_str() == "P3"
        ));
    }

    #[test]
    fn test_insufficient_stock_names_product() {
        let result = validate_cart(
            &[LineItem::new("P1", 1), LineItem::new("P2", 2)],
            &snapshot(),
        );
        assert_eq!(
            result,
            Err(CheckoutError::InsufficientStock {
                product_id: ProductId::new("P2"),
                requested: 2,
                available: 1,
            })
        );
    }

    #[test]
    fn test_mixed_stores_rejected() {
        let result = validate_cart(
            &[LineItem::new("P1", 1), LineItem::new("Q1", 1)],
            &snapshot(),
        );
        assert!(matches!(result, Err(CheckoutError::MixedStores { .. })));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(
            validate_line_items(&[]),
            Err(CheckoutError::Validation { field, .. }) if field == "items"
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(matches!(
            validate_line_items(&[LineItem::new("P1", 0)]),
            Err(CheckoutError::Validation { field, .. }) if field == "items[0].quantity"
        ));
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let result = validate_line_items(&[LineItem::new("P1", 1), LineItem::new("P1", 2)]);
        assert!(matches!(
            result,
            Err(CheckoutError::Validation { field, .. }) if field == "items[1].product_id"
        ));
    }

    #[test]
    fn test_zero_weight_products_get_minimum_weight() {
        let snapshot = CatalogSnapshot::from_products(vec![Product::active(
            "D1",
            "store-a",
            "E-book voucher",
            Money::from_minor(5000),
            3,
            0,
        )]);
        let cart = validate_cart(&[LineItem::new("D1", 3)], &snapshot).unwrap();
        assert_eq!(cart.weight_gram, crate::shipping::MIN_SHIPMENT_WEIGHT_GRAMS);
    }

    #[test]
    fn test_overflowing_amount_rejected() {
        let snapshot = CatalogSnapshot::from_products(vec![Product::active(
            "GOLD",
            "store-a",
            "Gold Bar",
            Money::from_minor(i64::MAX / 2),
            10,
            1000,
        )]);

        let err = validate_cart(&[LineItem::new("GOLD", 3)], &snapshot).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation { ref field, .. } if field == "items[0].quantity"
        ));
    }
}

//! Catalog snapshot types consumed by checkout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::{Money, ProductId, StoreId};

/// Publication status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Listed and purchasable.
    Active,

    /// Not yet published by the seller.
    #[default]
    Draft,

    /// Withdrawn from sale.
    Archived,
}

impl ProductStatus {
    /// Returns true if the product can be bought.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Archived => "archived",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "draft" => Some(ProductStatus::Draft),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A product as seen by checkout at the moment of the catalog read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub weight_gram: u32,
    pub status: ProductStatus,
}

impl Product {
    /// Creates an active product.
    pub fn active(
        id: impl Into<ProductId>,
        store_id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
        weight_gram: u32,
    ) -> Self {
        Self {
            id: id.into(),
            store_id: StoreId::new(store_id),
            name: name.into(),
            price,
            stock,
            weight_gram,
            status: ProductStatus::Active,
        }
    }

    /// Returns a copy with a different status.
    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }
}

/// Point-in-time view of a set of products, keyed by id.
///
/// Products that do not exist are simply absent.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<ProductId, Product>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from the products that were found.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Returns a product by id.
    pub fn get(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.get(product_id)
    }

    /// Returns the number of products found.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if no product was found.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Returns all products in the snapshot.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }
}

/// Per-store shipping configuration maintained by the seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerShippingSettings {
    pub store_id: StoreId,

    /// Postal code the seller ships from; the regional default applies when unset.
    pub origin_postal_code: Option<String>,

    /// Courier codes the seller accepts, e.g. `["jne", "sicepat"]`.
    pub enabled_couriers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_is_purchasable() {
        assert!(ProductStatus::Active.is_purchasable());
        assert!(!ProductStatus::Draft.is_purchasable());
        assert!(!ProductStatus::Archived.is_purchasable());
    }

    #[test]
    fn test_status_parse_matches_as_str() {
        for status in [
            ProductStatus::Active,
            ProductStatus::Draft,
            ProductStatus::Archived,
        ] {
            assert_eq!(ProductStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProductStatus::parse("deleted"), None);
    }

    #[test]
    fn test_snapshot_omits_missing_products() {
        let snapshot = CatalogSnapshot::from_products(vec![Product::active(
            "P1",
            "store-a",
            "Batik Shirt",
            Money::from_minor(15000),
            5,
            500,
        )]);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&ProductId::new("P1")).is_some());
        assert!(snapshot.get(&ProductId::new("P2")).is_none());
    }
}

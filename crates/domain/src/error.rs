//! Checkout error types.

use thiserror::Error;

use crate::value_objects::{ProductId, StoreId};

/// Reasons a checkout is rejected before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The checkout payload is malformed.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A requested product does not exist or is not active.
    #[error("Product {product_id} is not available")]
    ProductUnavailable { product_id: ProductId },

    /// A requested quantity exceeds the product's stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The cart contains products from more than one store.
    #[error("Items belong to more than one store ({first} and {other})")]
    MixedStores { first: StoreId, other: StoreId },
}

impl CheckoutError {
    /// Creates a validation error for a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CheckoutError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

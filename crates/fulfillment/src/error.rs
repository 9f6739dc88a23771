//! Fulfillment error types.

use common::OrderId;
use domain::{CheckoutError, OrderError, StoreId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in the fulfillment services.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Checkout was rejected before anything was persisted.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The order refused the requested action.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order belongs to another store.
    #[error("Order {order_id} does not belong to store {store_id}")]
    NotOrderOwner { order_id: OrderId, store_id: StoreId },

    /// The external rate provider failed.
    #[error("Rate provider error: {message}")]
    RateProvider { message: String },

    /// The webhook signature did not match.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The webhook body could not be understood.
    #[error("Malformed notification: {0}")]
    MalformedNotification(String),

    /// The order kept changing underneath us.
    #[error("Order {0} is being updated concurrently")]
    Contention(OrderId),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    pub(crate) fn rate_provider(message: impl Into<String>) -> Self {
        FulfillmentError::RateProvider {
            message: message.into(),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

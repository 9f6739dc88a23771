//! Fulfillment services for the order pipeline.
//!
//! Each service wraps the store and drives one flow:
//! 1. [`ShippingRateAggregator`] quotes couriers for a cart
//! 2. [`CheckoutService`] validates the cart and places the order
//! 3. [`PaymentReconciler`] applies payment gateway notifications
//! 4. [`ShipmentTracker`] applies the seller's processing, tracking and
//!    delivery actions

pub mod checkout;
pub mod error;
pub mod payments;
pub mod services;
pub mod shipping;
pub mod tracking;

pub use checkout::{CheckoutRequest, CheckoutService};
pub use error::{FulfillmentError, Result};
pub use payments::{PaymentReconciler, ReconcileOutcome, SignatureVerifier, body_digest};
pub use services::{HttpRateProvider, InMemoryRateProvider, RateProvider};
pub use shipping::{RateInquiry, ShippingDefaults, ShippingRateAggregator};
pub use tracking::ShipmentTracker;

//! Domain layer for the order fulfillment pipeline.
//!
//! This crate holds the pure, I/O-free rules:
//! - Catalog snapshot and the pricing & stock validator
//! - Shipping value objects and the billable weight rule
//! - The order entity and its status state machine
//! - Payment gateway vocabulary and its translation table

pub mod catalog;
pub mod checkout;
pub mod error;
pub mod order;
pub mod payment;
pub mod shipping;
pub mod value_objects;

pub use catalog::{CatalogSnapshot, Product, ProductStatus, SellerShippingSettings};
pub use checkout::{LineItem, PricedCart, validate_cart, validate_line_items};
pub use error::CheckoutError;
pub use order::{Order, OrderError, OrderEvent, OrderItem, OrderParts, OrderStatus};
pub use payment::{
    FraudStatus, GatewayNotification, NotificationError, PaymentCommand, PaymentVerdict,
    TransactionStatus, translate,
};
pub use shipping::{
    ChosenShipping, DeliveryAddress, MIN_SHIPMENT_WEIGHT_GRAMS, Shipment, ShipmentStatus,
    ShippingAddress, ShippingQuote, shipment_weight,
};
pub use value_objects::{BuyerId, Money, ProductId, StoreId};

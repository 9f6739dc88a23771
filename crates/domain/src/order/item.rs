//! Order line items.

use serde::{Deserialize, Serialize};

use crate::value_objects::{Money, ProductId};

/// An item in an order.
///
/// The unit price is copied from the catalog when the order is placed and
/// never looked up again, so later price changes do not touch history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at the time of purchase.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit in minor units.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity × unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

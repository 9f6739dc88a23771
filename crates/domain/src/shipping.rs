//! Shipping value objects: delivery address, courier quotes, and shipments.

use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;
use crate::value_objects::Money;

/// Rate providers reject zero-weight parcels, so every shipment weighs at
/// least this much.
pub const MIN_SHIPMENT_WEIGHT_GRAMS: u32 = 100;

/// Computes the billable shipment weight from `(weight_gram, quantity)` pairs.
pub fn shipment_weight(lines: impl IntoIterator<Item = (u32, u32)>) -> u32 {
    let raw: u64 = lines
        .into_iter()
        .map(|(weight, quantity)| u64::from(weight) * u64::from(quantity))
        .sum();
    u32::try_from(raw)
        .unwrap_or(u32::MAX)
        .max(MIN_SHIPMENT_WEIGHT_GRAMS)
}

/// One courier/service option returned by the rate provider.
///
/// Quotes are never persisted; the one the buyer picks is flattened into
/// the order's shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub courier_code: String,
    pub courier_service_code: String,
    pub courier_name: String,
    pub courier_service_name: String,
    pub duration: String,
    pub price: Money,
}

impl ShippingQuote {
    /// Returns the label shown to the buyer, e.g. `"JNE REG"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.courier_name, self.courier_service_name)
    }
}

/// Where the buyer wants the order delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl DeliveryAddress {
    /// Checks that the required fields are present.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        require_text("shipping_address.name", &self.name)?;
        require_text("shipping_address.phone", &self.phone)?;
        require_text("shipping_address.street", &self.street)?;
        Ok(())
    }
}

/// The quote the buyer selected, reduced to what the order keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenShipping {
    /// Courier label, e.g. `"JNE REG"`.
    pub courier: String,
    pub cost: Money,
    pub duration: String,
}

impl ChosenShipping {
    /// Checks that the selection is usable.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        require_text("shipping.courier", &self.courier)?;
        if self.cost.is_negative() {
            return Err(CheckoutError::validation(
                "shipping.cost",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

impl From<&ShippingQuote> for ChosenShipping {
    fn from(quote: &ShippingQuote) -> Self {
        Self {
            courier: quote.label(),
            cost: quote.price,
            duration: quote.duration.clone(),
        }
    }
}

/// Delivery address with the chosen courier embedded, as stored on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub courier: String,
    pub shipping_cost: Money,
    pub duration: String,
}

impl ShippingAddress {
    /// Combines the delivery address with the chosen courier.
    pub fn new(address: DeliveryAddress, shipping: ChosenShipping) -> Self {
        Self {
            name: address.name.trim().to_string(),
            phone: address.phone.trim().to_string(),
            street: address.street.trim().to_string(),
            city: address.city,
            province: address.province,
            postal_code: address.postal_code,
            courier: shipping.courier,
            shipping_cost: shipping.cost,
            duration: shipping.duration,
        }
    }
}

/// Progress of the physical parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Waiting for the seller to hand the parcel to the courier.
    #[default]
    AwaitingPickup,

    /// Handed over; a tracking code exists.
    InTransit,

    /// Received by the buyer.
    Delivered,
}

impl ShipmentStatus {
    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::AwaitingPickup => "awaiting_pickup",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "awaiting_pickup" => Some(ShipmentStatus::AwaitingPickup),
            "in_transit" => Some(ShipmentStatus::InTransit),
            "delivered" => Some(ShipmentStatus::Delivered),
            _ => None,
        }
    }
}

/// Shipment attached to an order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub courier: String,
    pub tracking_code: Option<String>,
    pub status: ShipmentStatus,
    pub estimated_delivery: String,
}

impl Shipment {
    /// Creates the shipment implied by a freshly placed order.
    pub fn for_address(address: &ShippingAddress) -> Self {
        Self {
            courier: address.courier.clone(),
            tracking_code: None,
            status: ShipmentStatus::AwaitingPickup,
            estimated_delivery: address.duration.clone(),
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        return Err(CheckoutError::validation(field, "is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            name: "Siti".to_string(),
            phone: "08123456789".to_string(),
            street: "Jl. Merdeka 1".to_string(),
            city: Some("Bandung".to_string()),
            province: None,
            postal_code: Some("40111".to_string()),
        }
    }

    #[test]
    fn test_weight_is_floored() {
        assert_eq!(shipment_weight(vec![]), MIN_SHIPMENT_WEIGHT_GRAMS);
        assert_eq!(shipment_weight(vec![(0, 3)]), MIN_SHIPMENT_WEIGHT_GRAMS);
        assert_eq!(shipment_weight(vec![(20, 2)]), MIN_SHIPMENT_WEIGHT_GRAMS);
    }

    #[test]
    fn test_weight_sums_quantity() {
        assert_eq!(shipment_weight(vec![(500, 2), (250, 1)]), 1250);
    }

    #[test]
    fn test_address_requires_name_phone_street() {
        assert!(address().validate().is_ok());

        let mut missing_phone = address();
        missing_phone.phone = "  ".to_string();
        assert_eq!(
            missing_phone.validate(),
            Err(CheckoutError::validation(
                "shipping_address.phone",
                "is required"
            ))
        );
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let json = r#"{"name":"Siti","phone":"0812","street":"Jl. Merdeka 1"}"#;
        let parsed: DeliveryAddress = serde_json::from_str(json).unwrap();
        assert!(parsed.city.is_none());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_negative_shipping_cost_rejected() {
        let shipping = ChosenShipping {
            courier: "JNE REG".to_string(),
            cost: Money::from_minor(-1),
            duration: "2-3 days".to_string(),
        };
        assert!(matches!(
            shipping.validate(),
            Err(CheckoutError::Validation { field, .. }) if field == "shipping.cost"
        ));
    }

    #[test]
    fn test_quote_flattens_into_address() {
        let quote = ShippingQuote {
            courier_code: "jne".to_string(),
            courier_service_code: "reg".to_string(),
            courier_name: "JNE".to_string(),
            courier_service_name: "REG".to_string(),
            duration: "2-3 days".to_string(),
            price: Money::from_minor(9000),
        };
        let shipping_address = ShippingAddress::new(address(), ChosenShipping::from(&quote));

        assert_eq!(shipping_address.courier, "JNE REG");
        assert_eq!(shipping_address.shipping_cost, Money::from_minor(9000));

        let shipment = Shipment::for_address(&shipping_address);
        assert_eq!(shipment.status, ShipmentStatus::AwaitingPickup);
        assert_eq!(shipment.estimated_delivery, "2-3 days");
        assert!(shipment.tracking_code.is_none());
    }
}

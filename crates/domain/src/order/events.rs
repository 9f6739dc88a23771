//! Order domain events.
//!
//! Every status change and tracking write is described by an event. The
//! order applies events to itself, and the store appends them to the
//! order's audit trail.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::value_objects::Money;

/// Events that can occur on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed at checkout.
    OrderPlaced(OrderPlacedData),

    /// The gateway confirmed the payment.
    PaymentConfirmed(GatewayEventData),

    /// The gateway denied, expired, or cancelled the payment.
    PaymentCancelled(GatewayEventData),

    /// The gateway refunded the payment.
    PaymentRefunded(GatewayEventData),

    /// Seller started preparing the parcel.
    ProcessingStarted(SellerActionData),

    /// Seller entered or corrected a tracking code.
    TrackingRecorded(TrackingData),

    /// Parcel handed to the courier.
    OrderShipped(TrackingData),

    /// Seller confirmed the buyer received the parcel.
    OrderDelivered(SellerActionData),
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::PaymentConfirmed(_) => "PaymentConfirmed",
            OrderEvent::PaymentCancelled(_) => "PaymentCancelled",
            OrderEvent::PaymentRefunded(_) => "PaymentRefunded",
            OrderEvent::ProcessingStarted(_) => "ProcessingStarted",
            OrderEvent::TrackingRecorded(_) => "TrackingRecorded",
            OrderEvent::OrderShipped(_) => "OrderShipped",
            OrderEvent::OrderDelivered(_) => "OrderDelivered",
        }
    }

    /// Returns the status the order ends up in, or `None` if the event
    /// leaves the status untouched.
    pub fn target_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::OrderPlaced(_) => Some(OrderStatus::Pending),
            OrderEvent::PaymentConfirmed(_) => Some(OrderStatus::Paid),
            OrderEvent::PaymentCancelled(_) => Some(OrderStatus::Cancelled),
            OrderEvent::PaymentRefunded(_) => Some(OrderStatus::Refunded),
            OrderEvent::ProcessingStarted(_) => Some(OrderStatus::Processing),
            OrderEvent::TrackingRecorded(_) => None,
            OrderEvent::OrderShipped(_) => Some(OrderStatus::Shipped),
            OrderEvent::OrderDelivered(_) => Some(OrderStatus::Delivered),
        }
    }

    /// Returns the gateway event id, for payment events.
    pub fn gateway_event_id(&self) -> Option<&str> {
        match self {
            OrderEvent::PaymentConfirmed(data)
            | OrderEvent::PaymentCancelled(data)
            | OrderEvent::PaymentRefunded(data) => Some(&data.gateway_event_id),
            _ => None,
        }
    }

    /// Returns the tracking code, for tracking events.
    pub fn tracking_code(&self) -> Option<&str> {
        match self {
            OrderEvent::TrackingRecorded(data) | OrderEvent::OrderShipped(data) => {
                Some(&data.tracking_code)
            }
            _ => None,
        }
    }

    /// Returns when the event happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(data) => data.placed_at,
            OrderEvent::PaymentConfirmed(data)
            | OrderEvent::PaymentCancelled(data)
            | OrderEvent::PaymentRefunded(data) => data.received_at,
            OrderEvent::ProcessingStarted(data) | OrderEvent::OrderDelivered(data) => data.at,
            OrderEvent::TrackingRecorded(data) | OrderEvent::OrderShipped(data) => data.at,
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub total_amount: Money,
    pub item_count: usize,
    pub placed_at: DateTime<Utc>,
}

/// Data for events driven by a payment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEventData {
    /// Identifier of the notification that caused the event.
    pub gateway_event_id: String,

    /// Gateway `transaction_status` word, kept for operators.
    pub transaction_status: String,

    pub received_at: DateTime<Utc>,
}

/// Data for events driven by a seller action without a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerActionData {
    pub at: DateTime<Utc>,
}

/// Data for tracking events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingData {
    pub tracking_code: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_recorded_keeps_status() {
        let event = OrderEvent::TrackingRecorded(TrackingData {
            tracking_code: "JNE123".to_string(),
            at: Utc::now(),
        });
        assert_eq!(event.target_status(), None);
        assert_eq!(event.tracking_code(), Some("JNE123"));
    }

    #[test]
    fn test_gateway_event_id_only_on_payment_events() {
        let event = OrderEvent::PaymentConfirmed(GatewayEventData {
            gateway_event_id: "tx-1:settlement".to_string(),
            transaction_status: "settlement".to_string(),
            received_at: Utc::now(),
        });
        assert_eq!(event.gateway_event_id(), Some("tx-1:settlement"));
        assert_eq!(event.target_status(), Some(OrderStatus::Paid));

        let shipped = OrderEvent::OrderDelivered(SellerActionData { at: Utc::now() });
        assert_eq!(shipped.gateway_event_id(), None);
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = OrderEvent::ProcessingStarted(SellerActionData { at: Utc::now() });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProcessingStarted");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

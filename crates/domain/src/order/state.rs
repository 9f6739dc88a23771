//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Paid ──► Processing ──► Shipped ──► Delivered
///    │        │ │ │                     ▲
///    │        │ │ └─────────────────────┘
///    │        │ └──► Refunded
///    ▼        │
/// Cancelled ◄─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, waiting for the payment gateway.
    #[default]
    Pending,

    /// Payment captured.
    Paid,

    /// Seller is preparing the parcel.
    Processing,

    /// Parcel handed to the courier (tracking code recorded).
    Shipped,

    /// Buyer received the parcel (terminal state).
    Delivered,

    /// Payment failed or was cancelled (terminal state).
    Cancelled,

    /// Payment was returned to the buyer (terminal state).
    Refunded,
}

impl OrderStatus {
    /// Returns true if the transition graph has an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Processing)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Paid, Refunded)
                | (Processing, Shipped)
                | (Shipped, Delivered)
        )
    }

    /// Returns true if a payment confirmation can move the order to `Paid`.
    pub fn can_confirm_payment(&self) -> bool {
        self.can_transition_to(OrderStatus::Paid)
    }

    /// Returns true if the order can be cancelled by the gateway.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true if the payment can be refunded.
    pub fn can_refund(&self) -> bool {
        self.can_transition_to(OrderStatus::Refunded)
    }

    /// Returns true if the seller can start processing.
    pub fn can_start_processing(&self) -> bool {
        self.can_transition_to(OrderStatus::Processing)
    }

    /// Returns true if a tracking code may be written in this state.
    pub fn can_record_tracking(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Shipped
        )
    }

    /// Returns true if the order can be marked as shipped.
    pub fn can_ship(&self) -> bool {
        self.can_transition_to(OrderStatus::Shipped)
    }

    /// Returns true if delivery can be confirmed.
    pub fn can_deliver(&self) -> bool {
        self.can_transition_to(OrderStatus::Delivered)
    }

    /// Returns true once payment has been confirmed, whatever happened after.
    pub fn is_past_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Processing
                | OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::Refunded
        )
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_only_pending_can_confirm_payment() {
        for status in OrderStatus::ALL {
            assert_eq!(status.can_confirm_payment(), status == OrderStatus::Pending);
        }
    }

    #[test]
    fn test_cancel_from_pending_or_paid() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
        assert!(!OrderStatus::Refunded.can_cancel());
    }

    #[test]
    fn test_refund_only_from_paid() {
        for status in OrderStatus::ALL {
            assert_eq!(status.can_refund(), status == OrderStatus::Paid);
        }
    }

    #[test]
    fn test_ship_from_paid_or_processing() {
        assert!(OrderStatus::Paid.can_ship());
        assert!(OrderStatus::Processing.can_ship());
        assert!(!OrderStatus::Pending.can_ship());
        assert!(!OrderStatus::Shipped.can_ship());
        assert!(!OrderStatus::Delivered.can_ship());
    }

    #[test]
    fn test_tracking_guard() {
        assert!(!OrderStatus::Pending.can_record_tracking());
        assert!(OrderStatus::Paid.can_record_tracking());
        assert!(OrderStatus::Processing.can_record_tracking());
        assert!(OrderStatus::Shipped.can_record_tracking());
        assert!(!OrderStatus::Delivered.can_record_tracking());
        assert!(!OrderStatus::Cancelled.can_record_tracking());
        assert!(!OrderStatus::Refunded.can_record_tracking());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal) {
            for next in OrderStatus::ALL {
                assert!(!status.can_transition_to(next), "{status} -> {next}");
            }
        }
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(OrderStatus::Pending));
        }
    }

    #[test]
    fn test_parse_matches_display() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(OrderStatus::parse("Paid"), None);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, OrderStatus::Processing);
    }
}

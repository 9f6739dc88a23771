//! Order entity and related types.

mod aggregate;
mod events;
mod item;
mod state;

pub use aggregate::{Order, OrderParts};
pub use events::{GatewayEventData, OrderEvent, OrderPlacedData, SellerActionData, TrackingData};
pub use item::OrderItem;
pub use state::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    /// The gateway notification was already applied to this order.
    #[error("Gateway event {event_id} was already processed")]
    DuplicateGatewayEvent { event_id: String },

    /// A tracking code is required for this action.
    #[error("Tracking code is required")]
    TrackingCodeRequired,
}

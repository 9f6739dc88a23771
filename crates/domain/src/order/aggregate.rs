//! Order entity implementation.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::checkout::PricedCart;
use crate::error::CheckoutError;
use crate::payment::{PaymentCommand, PaymentVerdict};
use crate::shipping::{ChosenShipping, DeliveryAddress, Shipment, ShipmentStatus, ShippingAddress};
use crate::value_objects::{BuyerId, Money, StoreId};

use super::events::{GatewayEventData, OrderPlacedData, SellerActionData, TrackingData};
use super::{OrderError, OrderEvent, OrderItem, OrderStatus};

/// Order root entity.
///
/// Created once at checkout. Afterwards only the status, the shipment
/// tracking fields and the last processed gateway event id ever change, and
/// only through events produced by the command methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    buyer_id: BuyerId,
    store_id: StoreId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    total_amount: Money,
    discount_amount: Money,
    shipping_address: ShippingAddress,
    shipment: Shipment,
    last_gateway_event_id: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Raw order fields, used by storage to rebuild an [`Order`].
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub store_id: StoreId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub shipping_address: ShippingAddress,
    pub shipment: Shipment,
    pub last_gateway_event_id: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order from a priced cart.
    ///
    /// The total is the items total plus the chosen shipping cost. Discounts
    /// are not evaluated, so the discount is always zero.
    pub fn place(
        id: OrderId,
        buyer_id: BuyerId,
        cart: PricedCart,
        address: DeliveryAddress,
        shipping: ChosenShipping,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, CheckoutError> {
        if buyer_id.as_str().trim().is_empty() {
            return Err(CheckoutError::validation("buyer_id", "is required"));
        }
        if cart.items.is_empty() {
            return Err(CheckoutError::validation("items", "must not be empty"));
        }
        address.validate()?;
        shipping.validate()?;

        let shipping_address = ShippingAddress::new(address, shipping);
        let shipment = Shipment::for_address(&shipping_address);
        let discount_amount = Money::zero();
        let total_amount = cart
            .items_total
            .checked_add(shipping_address.shipping_cost)
            .and_then(|total| total.checked_sub(discount_amount))
            .ok_or_else(|| CheckoutError::validation("shipping.cost", "is too large"))?;

        Ok(Self {
            id,
            buyer_id,
            store_id: cart.store_id,
            status: OrderStatus::Pending,
            items: cart.items,
            total_amount,
            discount_amount,
            shipping_address,
            shipment,
            last_gateway_event_id: None,
            version: 0,
            created_at: placed_at,
            updated_at: placed_at,
        })
    }

    /// Rebuilds an order from stored fields.
    pub fn from_parts(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            buyer_id: parts.buyer_id,
            store_id: parts.store_id,
            status: parts.status,
            items: parts.items,
            total_amount: parts.total_amount,
            discount_amount: parts.discount_amount,
            shipping_address: parts.shipping_address,
            shipment: parts.shipment,
            last_gateway_event_id: parts.last_gateway_event_id,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    /// Returns the event recording this order's placement.
    pub fn placed_event(&self) -> OrderEvent {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: self.id,
            total_amount: self.total_amount,
            item_count: self.items.len(),
            placed_at: self.created_at,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> &BuyerId {
        &self.buyer_id
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }

    pub fn last_gateway_event_id(&self) -> Option<&str> {
        self.last_gateway_event_id.as_deref()
    }

    /// Number of writes applied since placement.
    ///
    /// Storage compares it on every update so a decision made on a stale
    /// copy never overwrites a newer one.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the sum of item subtotals.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Returns true if the order belongs to the given store.
    pub fn belongs_to(&self, store_id: &StoreId) -> bool {
        &self.store_id == store_id
    }

    /// Returns true if the notification with this id was the last one applied.
    pub fn has_processed(&self, gateway_event_id: &str) -> bool {
        self.last_gateway_event_id.as_deref() == Some(gateway_event_id)
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Decides what a payment notification does to this order.
    ///
    /// `Ok(None)` means the notification is acknowledged without a status
    /// change: still waiting for settlement, or already in the target state.
    pub fn apply_payment(
        &self,
        command: &PaymentCommand,
        received_at: DateTime<Utc>,
    ) -> Result<Option<OrderEvent>, OrderError> {
        if self.has_processed(&command.event_id) {
            return Err(OrderError::DuplicateGatewayEvent {
                event_id: command.event_id.clone(),
            });
        }

        let data = || GatewayEventData {
            gateway_event_id: command.event_id.clone(),
            transaction_status: command.transaction_status.as_str().to_string(),
            received_at,
        };

        match command.verdict {
            PaymentVerdict::AwaitSettlement => Ok(None),
            PaymentVerdict::Confirm => {
                if self.status.can_confirm_payment() {
                    Ok(Some(OrderEvent::PaymentConfirmed(data())))
                } else if self.status.is_past_payment() && self.status != OrderStatus::Refunded {
                    Ok(None)
                } else {
                    Err(self.invalid_transition("confirm payment"))
                }
            }
            PaymentVerdict::Lapse => match self.status {
                OrderStatus::Pending => Ok(Some(OrderEvent::PaymentCancelled(data()))),
                OrderStatus::Cancelled => Ok(None),
                _ => Err(self.invalid_transition("expire payment")),
            },
            PaymentVerdict::Void => {
                if self.status.can_cancel() {
                    Ok(Some(OrderEvent::PaymentCancelled(data())))
                } else if self.status == OrderStatus::Cancelled {
                    Ok(None)
                } else {
                    Err(self.invalid_transition("cancel payment"))
                }
            }
            PaymentVerdict::Refund => {
                if self.status.can_refund() {
                    Ok(Some(OrderEvent::PaymentRefunded(data())))
                } else if self.status == OrderStatus::Refunded {
                    Ok(None)
                } else {
                    Err(self.invalid_transition("refund payment"))
                }
            }
        }
    }

    /// Starts processing a paid order.
    pub fn start_processing(&self, at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        if !self.status.can_start_processing() {
            return Err(self.invalid_transition("start processing"));
        }
        Ok(OrderEvent::ProcessingStarted(SellerActionData { at }))
    }

    /// Records a tracking code without changing the status.
    pub fn record_tracking(
        &self,
        tracking_code: &str,
        at: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        let tracking_code = tracking_code.trim();
        if tracking_code.is_empty() {
            return Err(OrderError::TrackingCodeRequired);
        }
        if !self.status.can_record_tracking() {
            return Err(self.invalid_transition("record tracking code"));
        }
        Ok(OrderEvent::TrackingRecorded(TrackingData {
            tracking_code: tracking_code.to_string(),
            at,
        }))
    }

    /// Marks the order as shipped. A tracking code must already be recorded.
    pub fn ship(&self, at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        if !self.status.can_ship() {
            return Err(self.invalid_transition("ship"));
        }
        let tracking_code = self
            .shipment
            .tracking_code
            .clone()
            .ok_or(OrderError::TrackingCodeRequired)?;
        Ok(OrderEvent::OrderShipped(TrackingData { tracking_code, at }))
    }

    /// Confirms the buyer received the parcel.
    pub fn confirm_delivery(&self, at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        if !self.status.can_deliver() {
            return Err(self.invalid_transition("confirm delivery"));
        }
        Ok(OrderEvent::OrderDelivered(SellerActionData { at }))
    }

    fn invalid_transition(&self, action: &'static str) -> OrderError {
        OrderError::InvalidStateTransition {
            current_state: self.status,
            action,
        }
    }
}

// Apply events
impl Order {
    /// Applies an event, updating state.
    pub fn apply(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(_) => {}
            OrderEvent::PaymentConfirmed(data)
            | OrderEvent::PaymentCancelled(data)
            | OrderEvent::PaymentRefunded(data) => {
                self.last_gateway_event_id = Some(data.gateway_event_id.clone());
            }
            OrderEvent::ProcessingStarted(_) => {}
            OrderEvent::TrackingRecorded(data) => {
                self.shipment.tracking_code = Some(data.tracking_code.clone());
            }
            OrderEvent::OrderShipped(data) => {
                self.shipment.tracking_code = Some(data.tracking_code.clone());
                self.shipment.status = ShipmentStatus::InTransit;
            }
            OrderEvent::OrderDelivered(_) => {
                self.shipment.status = ShipmentStatus::Delivered;
            }
        }
        if let Some(status) = event.target_status() {
            self.status = status;
        }
        self.updated_at = event.occurred_at();
        self.version += 1;
    }

    /// Records a gateway notification that was acknowledged without a
    /// status change.
    pub fn remember_gateway_event(&mut self, gateway_event_id: &str, at: DateTime<Utc>) {
        self.last_gateway_event_id = Some(gateway_event_id.to_string());
        self.updated_at = at;
        self.version += 1;
    }
}

//! Payment gateway vocabulary and its translation into order decisions.
//!
//! Notifications arrive as untrusted JSON ([`GatewayNotification`]). Only
//! after the signature has been checked and the status words have been
//! recognised does a notification become a [`PaymentCommand`] that the order
//! state machine will consider.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `transaction_status` values the gateway is known to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Refund,
    PartialRefund,
}

impl TransactionStatus {
    /// Parses the gateway's wire value. Unknown words yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "capture" => Some(TransactionStatus::Capture),
            "settlement" => Some(TransactionStatus::Settlement),
            "pending" => Some(TransactionStatus::Pending),
            "deny" => Some(TransactionStatus::Deny),
            "cancel" => Some(TransactionStatus::Cancel),
            "expire" => Some(TransactionStatus::Expire),
            "refund" => Some(TransactionStatus::Refund),
            "partial_refund" => Some(TransactionStatus::PartialRefund),
            _ => None,
        }
    }

    /// Returns the gateway's wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Refund => "refund",
            TransactionStatus::PartialRefund => "partial_refund",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `fraud_status` values attached to card captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
}

impl FraudStatus {
    /// Parses the gateway's wire value. Unknown words yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(FraudStatus::Accept),
            "challenge" => Some(FraudStatus::Challenge),
            "deny" => Some(FraudStatus::Deny),
            _ => None,
        }
    }
}

/// What a recognised notification asks the order to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentVerdict {
    /// Funds captured and cleared by fraud screening.
    Confirm,

    /// Nothing final yet; the order stays as it is.
    AwaitSettlement,

    /// The payment was explicitly cancelled; valid while unpaid or paid.
    Void,

    /// The payment attempt died (denied or expired); only meaningful while unpaid.
    Lapse,

    /// Money went back to the buyer.
    Refund,
}

/// Translates gateway vocabulary into a verdict.
///
/// Exhaustive over both enums so a new gateway word cannot slip through
/// without a decision.
pub fn translate(status: TransactionStatus, fraud: Option<FraudStatus>) -> PaymentVerdict {
    match (status, fraud) {
        (
            TransactionStatus::Capture | TransactionStatus::Settlement,
            None | Some(FraudStatus::Accept),
        ) => PaymentVerdict::Confirm,
        (
            TransactionStatus::Capture | TransactionStatus::Settlement,
            Some(FraudStatus::Challenge),
        ) => PaymentVerdict::AwaitSettlement,
        (TransactionStatus::Capture | TransactionStatus::Settlement, Some(FraudStatus::Deny)) => {
            PaymentVerdict::Lapse
        }
        (TransactionStatus::Pending, _) => PaymentVerdict::AwaitSettlement,
        (TransactionStatus::Deny | TransactionStatus::Expire, _) => PaymentVerdict::Lapse,
        (TransactionStatus::Cancel, _) => PaymentVerdict::Void,
        (TransactionStatus::Refund | TransactionStatus::PartialRefund, _) => PaymentVerdict::Refund,
    }
}

/// A payment notification exactly as the gateway sent it.
///
/// Nothing in here is trusted: fields may be missing or carry words this
/// system does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GatewayNotification {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Why a notification could not become a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// No `order_id`; the notification is malformed.
    #[error("Notification has no order_id")]
    MissingOrderId,

    /// The status words are not part of the translation table.
    #[error("Unmapped gateway status: transaction_status={transaction_status}, fraud_status={fraud_status}")]
    Unmapped {
        transaction_status: String,
        fraud_status: String,
    },
}

/// A validated payment notification, ready for the order state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCommand {
    /// The order reference as sent by the gateway.
    pub order_ref: String,

    /// Identifier used to recognise redelivery of the same notification.
    pub event_id: String,

    pub transaction_status: TransactionStatus,
    pub fraud_status: Option<FraudStatus>,
    pub verdict: PaymentVerdict,
}

impl GatewayNotification {
    /// Validates the notification and translates it.
    ///
    /// `body_digest` identifies the notification when the gateway did not
    /// send a `transaction_id`.
    pub fn into_command(self, body_digest: &str) -> Result<PaymentCommand, NotificationError> {
        let order_ref = self
            .order_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(NotificationError::MissingOrderId)?;

        let raw_status = self.transaction_status.unwrap_or_default();
        let unmapped = || NotificationError::Unmapped {
            transaction_status: raw_status.clone(),
            fraud_status: self.fraud_status.clone().unwrap_or_default(),
        };

        let transaction_status = TransactionStatus::parse(&raw_status).ok_or_else(unmapped)?;
        let fraud_status = match self.fraud_status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(FraudStatus::parse(raw).ok_or_else(unmapped)?),
        };

        let event_id = match self.transaction_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("{id}:{transaction_status}"),
            _ => body_digest.to_string(),
        };

        Ok(PaymentCommand {
            order_ref,
            event_id,
            transaction_status,
            fraud_status,
            verdict: translate(transaction_status, fraud_status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(status: &str, fraud: Option<&str>) -> GatewayNotification {
        GatewayNotification {
            order_id: Some("8a2c6f0e-0000-4000-8000-000000000001".to_string()),
            transaction_status: Some(status.to_string()),
            fraud_status: fraud.map(str::to_string),
            transaction_id: Some("tx-1".to_string()),
        }
    }

    #[test]
    fn test_translation_table() {
        use FraudStatus as F;
        use PaymentVerdict as V;
        use TransactionStatus as T;

        assert_eq!(translate(T::Settlement, None), V::Confirm);
        assert_eq!(translate(T::Capture, None), V::Confirm);
        assert_eq!(translate(T::Capture, Some(F::Accept)), V::Confirm);
        assert_eq!(translate(T::Capture, Some(F::Challenge)), V::AwaitSettlement);
        assert_eq!(translate(T::Capture, Some(F::Deny)), V::Lapse);
        assert_eq!(translate(T::Pending, None), V::AwaitSettlement);
        assert_eq!(translate(T::Deny, None), V::Lapse);
        assert_eq!(translate(T::Expire, None), V::Lapse);
        assert_eq!(translate(T::Cancel, None), V::Void);
        assert_eq!(translate(T::Refund, None), V::Refund);
        assert_eq!(translate(T::PartialRefund, None), V::Refund);
    }

    #[test]
    fn test_status_parse_round_trips_known_words() {
        for word in [
            "capture",
            "settlement",
            "pending",
            "deny",
            "cancel",
            "expire",
            "refund",
            "partial_refund",
        ] {
            assert_eq!(TransactionStatus::parse(word).unwrap().as_str(), word);
        }
        assert_eq!(TransactionStatus::parse("chargeback"), None);
    }

    #[test]
    fn test_into_command_builds_event_id_from_transaction() {
        let cmd = notification("settlement", None)
            .into_command("digest")
            .unwrap();
        assert_eq!(cmd.event_id, "tx-1:settlement");
        assert_eq!(cmd.verdict, PaymentVerdict::Confirm);
    }

    #[test]
    fn test_into_command_falls_back_to_digest() {
        let mut n = notification("pending", None);
        n.transaction_id = None;
        let cmd = n.into_command("abc123").unwrap();
        assert_eq!(cmd.event_id, "abc123");
    }

    #[test]
    fn test_missing_order_id_is_malformed() {
        let mut n = notification("settlement", None);
        n.order_id = Some("   ".to_string());
        assert_eq!(
            n.into_command("d"),
            Err(NotificationError::MissingOrderId)
        );
    }

    #[test]
    fn test_unknown_status_is_unmapped() {
        let err = notification("chargeback", None)
            .into_command("d")
            .unwrap_err();
        assert!(matches!(err, NotificationError::Unmapped { transaction_status, .. } if transaction_status == "chargeback"));
    }

    #[test]
    fn test_unknown_fraud_status_is_unmapped() {
        let err = notification("capture", Some("review"))
            .into_command("d")
            .unwrap_err();
        assert!(matches!(err, NotificationError::Unmapped { fraud_status, .. } if fraud_status == "review"));
    }

    #[test]
    fn test_notification_deserializes_with_missing_fields() {
        let n: GatewayNotification =
            serde_json::from_str(r#"{"transaction_status":"settlement"}"#).unwrap();
        assert!(n.order_id.is_none());
        assert!(n.fraud_status.is_none());
    }
}

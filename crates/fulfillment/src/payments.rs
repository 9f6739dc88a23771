//! Payment gateway webhook handling.
//!
//! Notifications are verified, parsed into the untrusted
//! [`GatewayNotification`], translated into a [`PaymentCommand`], and only
//! then offered to the order. Every write is a compare-and-set on the order
//! version the decision was made against.

use chrono::Utc;
use common::OrderId;
use domain::{GatewayNotification, NotificationError, OrderError, OrderStatus};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use store::{OrderRepository, StoreError};

use crate::error::{FulfillmentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Attempts at applying one notification before giving up on a busy order.
const MAX_ATTEMPTS: usize = 3;

/// Checks the HMAC-SHA256 signature of webhook bodies.
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl SignatureVerifier {
    /// Creates a verifier. `None` or an empty secret disables verification.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Returns true if signatures are checked.
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns the hex signature for `body`, if a secret is configured.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verifies `signature` (hex) against `body`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        let Some(mut mac) = self.mac() else {
            return Ok(());
        };
        let provided = signature
            .map(str::trim)
            .and_then(|s| hex::decode(s).ok())
            .ok_or(FulfillmentError::InvalidSignature)?;

        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| FulfillmentError::InvalidSignature)
    }

    fn mac(&self) -> Option<HmacSha256> {
        let secret = self.secret.as_ref()?;
        HmacSha256::new_from_slice(secret.as_bytes()).ok()
    }
}

/// Hex SHA-256 of a webhook body.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// What happened to an acknowledged notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order moved to `status`.
    Applied { order_id: OrderId, status: OrderStatus },

    /// Recognised, but nothing to change.
    Unchanged { order_id: OrderId, status: OrderStatus },

    /// This notification was already applied.
    Duplicate { order_id: OrderId },

    /// The order's state does not allow what the notification asks.
    Rejected { order_id: OrderId, reason: String },

    /// Status words outside the translation table.
    Unmapped {
        transaction_status: String,
        fraud_status: String,
    },

    /// No order matches the reference.
    UnknownOrder { order_ref: String },
}

impl ReconcileOutcome {
    fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::Unchanged { .. } => "unchanged",
            ReconcileOutcome::Duplicate { .. } => "duplicate",
            ReconcileOutcome::Rejected { .. } => "rejected",
            ReconcileOutcome::Unmapped { .. } => "unmapped",
            ReconcileOutcome::UnknownOrder { .. } => "unknown_order",
        }
    }
}

/// Applies payment gateway notifications to orders.
pub struct PaymentReconciler<S> {
    store: S,
    verifier: SignatureVerifier,
}

impl<S: OrderRepository> PaymentReconciler<S> {
    /// Creates a new reconciler.
    pub fn new(store: S, verifier: SignatureVerifier) -> Self {
        Self { store, verifier }
    }

    /// Handles one raw notification.
    ///
    /// Errors are reserved for bodies that fail verification or cannot be
    /// read at all, and for storage failures. Everything else is an
    /// acknowledged [`ReconcileOutcome`].
    #[tracing::instrument(skip(self, body, signature), fields(bytes = body.len()))]
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> Result<ReconcileOutcome> {
        metrics::counter!("webhook_notifications_total").increment(1);

        if let Err(e) = self.verifier.verify(body, signature) {
            tracing::warn!("payment webhook signature verification failed");
            return Err(e);
        }

        let notification: GatewayNotification = serde_json::from_slice(body)
            .map_err(|e| FulfillmentError::MalformedNotification(e.to_string()))?;

        let outcome = self.reconcile(notification, &body_digest(body)).await?;
        match &outcome {
            ReconcileOutcome::Applied { order_id, status } => {
                metrics::counter!("webhook_applied").increment(1);
                tracing::info!(%order_id, %status, "payment notification applied");
            }
            other => {
                metrics::counter!("webhook_ignored", "reason" => other.label()).increment(1);
            }
        }
        Ok(outcome)
    }

    async fn reconcile(
        &self,
        notification: GatewayNotification,
        digest: &str,
    ) -> Result<ReconcileOutcome> {
        let command = match notification.into_command(digest) {
            Ok(command) => command,
            Err(NotificationError::MissingOrderId) => {
                return Err(FulfillmentError::MalformedNotification(
                    "missing order_id".to_string(),
                ));
            }
            Err(NotificationError::Unmapped {
                transaction_status,
                fraud_status,
            }) => {
                tracing::warn!(
                    %transaction_status,
                    %fraud_status,
                    "unmapped payment status, notification not applied"
                );
                return Ok(ReconcileOutcome::Unmapped {
                    transaction_status,
                    fraud_status,
                });
            }
        };

        let Ok(order_id) = command.order_ref.parse::<OrderId>() else {
            tracing::warn!(order_ref = %command.order_ref, "notification for unknown order");
            return Ok(ReconcileOutcome::UnknownOrder {
                order_ref: command.order_ref,
            });
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let Some(order) = self.store.get_order(order_id).await? else {
                tracing::warn!(%order_id, "notification for unknown order");
                return Ok(ReconcileOutcome::UnknownOrder {
                    order_ref: command.order_ref,
                });
            };
            let expected = order.status();
            let expected_version = order.version();
            let now = Utc::now();

            let written = match order.apply_payment(&command, now) {
                Err(OrderError::DuplicateGatewayEvent { event_id }) => {
                    tracing::info!(%order_id, %event_id, "duplicate payment notification");
                    return Ok(ReconcileOutcome::Duplicate { order_id });
                }
                Err(e) => {
                    tracing::warn!(
                        %order_id,
                        transaction_status = %command.transaction_status,
                        error = %e,
                        "payment notification ignored"
                    );
                    return Ok(ReconcileOutcome::Rejected {
                        order_id,
                        reason: e.to_string(),
                    });
                }
                Ok(None) => self
                    .store
                    .record_gateway_event(order_id, expected_version, &command.event_id, now)
                    .await
                    .map(|()| ReconcileOutcome::Unchanged {
                        order_id,
                        status: expected,
                    }),
                Ok(Some(event)) => {
                    let mut updated = order;
                    updated.apply(&event);
                    let status = updated.status();
                    self.store
                        .save_transition(&updated, expected, expected_version, &event)
                        .await
                        .map(|()| ReconcileOutcome::Applied { order_id, status })
                }
            };

            match written {
                Ok(outcome) => return Ok(outcome),
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    tracing::debug!(%order_id, attempt, "order changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FulfillmentError::Contention(order_id))
    }
}

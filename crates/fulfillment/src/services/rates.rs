//! Shipping rate provider trait, HTTP client and in-memory implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Money, ShippingQuote};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// One parcel line sent to the rate provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateItem {
    pub name: String,
    /// Weight in grams.
    pub weight: u32,
    pub quantity: u32,
    /// Declared value in minor units.
    pub value: i64,
}

/// A rate inquiry as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateRequest {
    pub origin_postal_code: String,
    pub destination_postal_code: String,
    /// Comma-joined courier codes, e.g. `"jne,jnt"`.
    pub couriers: String,
    pub items: Vec<RateItem>,
}

/// External multi-courier rate API.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Returns every quote the provider offers for the request.
    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>>;
}

#[derive(Debug, Deserialize)]
struct RateEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    pricing: Vec<PricingEntry>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RateEnvelope {
    fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

#[derive(Debug, Deserialize)]
struct PricingEntry {
    courier_code: String,
    #[serde(default)]
    courier_service_code: String,
    #[serde(default)]
    courier_name: String,
    #[serde(default)]
    courier_service_name: String,
    #[serde(default)]
    duration: String,
    price: i64,
}

impl From<PricingEntry> for ShippingQuote {
    fn from(entry: PricingEntry) -> Self {
        ShippingQuote {
            courier_code: entry.courier_code,
            courier_service_code: entry.courier_service_code,
            courier_name: entry.courier_name,
            courier_service_name: entry.courier_service_name,
            duration: entry.duration,
            price: Money::from_minor(entry.price),
        }
    }
}

/// Rate provider reached over HTTP.
#[derive(Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRateProvider {
    /// Creates a client for the provider at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fulfillment/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/rates/couriers", self.base_url)
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    #[tracing::instrument(skip(self, request), fields(couriers = %request.couriers))]
    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>> {
        let response = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| FulfillmentError::rate_provider(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FulfillmentError::rate_provider(format!("reading body failed: {e}")))?;
        let envelope = serde_json::from_str::<RateEnvelope>(&body);

        if !status.is_success() {
            let detail = envelope
                .ok()
                .and_then(|e| e.failure_message())
                .unwrap_or(body);
            return Err(FulfillmentError::rate_provider(format!(
                "provider answered {status}: {detail}"
            )));
        }

        let envelope = envelope
            .map_err(|e| FulfillmentError::rate_provider(format!("invalid response: {e}")))?;
        if !envelope.success {
            let detail = envelope
                .failure_message()
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(FulfillmentError::rate_provider(detail));
        }

        Ok(envelope.pricing.into_iter().map(ShippingQuote::from).collect())
    }
}

#[derive(Debug, Default)]
struct InMemoryRateState {
    quotes: Vec<ShippingQuote>,
    requests: Vec<RateRequest>,
    failure: Option<String>,
}

/// In-memory rate provider for testing and local runs.
///
/// Answers every request with the same canned quotes, whatever couriers
/// were asked for.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateProvider {
    state: Arc<RwLock<InMemoryRateState>>,
}

impl InMemoryRateProvider {
    /// Creates a provider that returns no quotes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that returns the given quotes.
    pub fn with_quotes(quotes: Vec<ShippingQuote>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryRateState {
                quotes,
                ..Default::default()
            })),
        }
    }

    /// Creates a provider with a few common domestic courier services.
    pub fn sample() -> Self {
        Self::with_quotes(vec![
            quote("jne", "reg", "JNE", "REG", "2 - 3 days", 9000),
            quote("jnt", "ez", "J&T", "EZ", "2 - 3 days", 10000),
            quote("sicepat", "reg", "SiCepat", "REG", "1 - 2 days", 8500),
        ])
    }

    /// Makes subsequent requests fail with the given upstream message.
    pub async fn set_failure(&self, message: Option<&str>) {
        self.state.write().await.failure = message.map(str::to_string);
    }

    /// Returns every request received so far.
    pub async fn requests(&self) -> Vec<RateRequest> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl RateProvider for InMemoryRateProvider {
    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>> {
        let mut state = self.state.write().await;
        state.requests.push(request.clone());

        if let Some(message) = &state.failure {
            return Err(FulfillmentError::rate_provider(message.clone()));
        }
        Ok(state.quotes.clone())
    }
}

/// Builds a quote; handy for canned providers.
pub fn quote(
    courier_code: &str,
    service_code: &str,
    courier_name: &str,
    service_name: &str,
    duration: &str,
    price: i64,
) -> ShippingQuote {
    ShippingQuote {
        courier_code: courier_code.to_string(),
        courier_service_code: service_code.to_string(),
        courier_name: courier_name.to_string(),
        courier_service_name: service_name.to_string(),
        duration: duration.to_string(),
        price: Money::from_minor(price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RateRequest {
        RateRequest {
            origin_postal_code: "10110".to_string(),
            destination_postal_code: "40111".to_string(),
            couriers: "jne".to_string(),
            items: vec![RateItem {
                name: "Parcel".to_string(),
                weight: 1000,
                quantity: 1,
                value: 30000,
            }],
        }
    }

    #[tokio::test]
    async fn test_in_memory_records_requests() {
        let provider = InMemoryRateProvider::sample();
        let quotes = provider.quote(&request()).await.unwrap();
        assert_eq!(quotes.len(), 3);
        assert_eq!(provider.requests().await, vec![request()]);
    }

    #[tokio::test]
    async fn test_in_memory_failure() {
        let provider = InMemoryRateProvider::sample();
        provider.set_failure(Some("origin not covered")).await;

        let err = provider.quote(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::RateProvider { ref message } if message == "origin not covered"
        ));
    }

    #[test]
    fn test_envelope_failure_message_prefers_error() {
        let envelope: RateEnvelope = serde_json::from_str(
            r#"{"success": false, "error": "bad area", "message": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(envelope.failure_message().as_deref(), Some("bad area"));
    }

    #[test]
    fn test_pricing_entry_into_quote() {
        let entry: PricingEntry = serde_json::from_str(
            r#"{"courier_code":"jne","courier_service_code":"reg","courier_name":"JNE",
                "courier_service_name":"REG","duration":"2 - 3 days","price":9000,
                "type":"reg"}"#,
        )
        .unwrap();
        let quote = ShippingQuote::from(entry);
        assert_eq!(quote.price, Money::from_minor(9000));
        assert_eq!(quote.label(), "JNE REG");
    }

    #[test]
    fn test_request_serializes_wire_shape() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["couriers"], "jne");
        assert_eq!(json["items"][0]["weight"], 1000);
        assert_eq!(json["items"][0]["value"], 30000);
    }
}

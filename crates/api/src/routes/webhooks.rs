//! Payment gateway webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use super::{SIGNATURE_HEADER, header_value};
use crate::error::ApiError;
use crate::{AppState, AppStore};

#[derive(Serialize)]
pub struct AckResponse {
    pub message: &'static str,
}

/// POST /webhooks/payment: payment status notification.
///
/// Every readable, correctly signed notification is acknowledged with
/// `200 {"message":"OK"}`, whether or not it changed the order, so the
/// gateway stops redelivering it.
#[tracing::instrument(skip(state, headers, body))]
pub async fn payment<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, ApiError> {
    let signature = header_value(&headers, SIGNATURE_HEADER);
    let outcome = state.payments.handle(&body, signature).await?;
    tracing::debug!(?outcome, "payment notification handled");

    Ok(Json(AckResponse { message: "OK" }))
}

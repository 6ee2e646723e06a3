//! HTTP endpoint handlers.
//!
//! The webhook handler is a two-stage pipeline: the body is captured as raw
//! bytes and verified first, and only a verified body is parsed as JSON.
//! No body-parsing layer may sit in front of it.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::WebhookError;
use crate::events::{dispatch_event, UserEvent};
use crate::store::UserStore;
use crate::web::signature::{verify_webhook, DeliveryHeaders, SecretError, SigningSecret};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UserStore>,
    signing_secret: Option<Result<SigningSecret, SecretError>>,
}

impl AppState {
    /// Build the state, decoding the webhook secret once up front.
    pub fn new(config: Config, store: Arc<dyn UserStore>) -> Self {
        let signing_secret = config
            .clerk_webhook_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(SigningSecret::parse);

        Self {
            config: Arc::new(config),
            store,
            signing_secret,
        }
    }

    /// The decoded secret, or the configuration error to report.
    pub fn signing_secret(&self) -> Result<&SigningSecret, WebhookError> {
        match &self.signing_secret {
            Some(Ok(secret)) => Ok(secret),
            Some(Err(e)) => Err(WebhookError::SecretInvalid(e.clone())),
            None => Err(WebhookError::SecretMissing),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness text for the root path.
pub async fn root() -> &'static str {
    "API is working"
}

/// Health check endpoint, including a store ping.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            warn!(error = %e, "health_store_unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded" }),
            )
        }
    }
}

// =============================================================================
// User Webhook
// =============================================================================

/// Webhook response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

impl WebhookResponse {
    pub fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}

/// Identity-provider user webhook endpoint.
///
/// This endpoint:
/// 1. Checks the delivery headers and the configured secret
/// 2. Verifies the signature over the raw body
/// 3. Parses the verified body and applies it to the user store
/// 4. Returns 200 for every handled or ignored event type
pub async fn user_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    info!(body_length = body.len(), "webhook_received");

    let delivery = match DeliveryHeaders::from_header_map(&headers) {
        Ok(delivery) => delivery,
        Err(e) => {
            warn!(missing = ?e.missing, "webhook_headers_missing");
            return Err(e.into());
        }
    };

    let secret = match state.signing_secret() {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "webhook_secret_unavailable");
            return Err(e);
        }
    };

    verify_webhook(
        secret,
        &delivery,
        &body,
        state.config.webhook_tolerance_secs,
    )?;

    let event = match UserEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(message_id = %delivery.id, error = %e, "webhook_payload_invalid");
            return Err(e.into());
        }
    };

    info!(
        message_id = %delivery.id,
        event_type = %event.event_type(),
        user_id = ?event.user_id(),
        "webhook_verified"
    );

    let outcome = match dispatch_event(state.store.as_ref(), event).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(message_id = %delivery.id, error = %e, "webhook_persist_failed");
            return Err(e.into());
        }
    };

    info!(
        message_id = %delivery.id,
        outcome = outcome.as_str(),
        "webhook_processed"
    );

    Ok(Json(WebhookResponse::success("Webhook received")))
}

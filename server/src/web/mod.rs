//! Web server module for the identity-provider webhook.
//!
//! This module provides a small axum server that:
//! - Receives Clerk user webhooks as raw bytes
//! - Verifies the Svix signature before anything is parsed
//! - Applies the verified event to the user store
//! - Exposes liveness and health routes
//!
//! The webhook routes carry no JSON body-parsing layer; the handler needs the
//! exact bytes that were signed.

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use handlers::{health, root, user_webhook, AppState, HealthResponse, WebhookResponse};
pub use signature::{verify_webhook, DeliveryHeaders, SignatureError, SigningSecret};

/// Path the identity provider is configured to deliver to.
pub const WEBHOOK_PATH: &str = "/api/clerk";

/// Provider-neutral alias of `WEBHOOK_PATH`.
pub const WEBHOOK_ALIAS_PATH: &str = "/api/webhook";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(user_webhook))
        .route(WEBHOOK_ALIAS_PATH, post(user_webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

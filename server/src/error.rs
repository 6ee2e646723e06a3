use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::events::EventError;
use crate::store::StoreError;
use crate::web::signature::{MissingHeaders, SecretError, SignatureError};
use crate::web::WebhookResponse;

/// Request-level failures of the webhook endpoint.
///
/// Client-facing messages are fixed strings; the detail carried by each
/// variant is for server logs only.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Webhook secret not configured")]
    SecretMissing,

    #[error("Webhook secret is invalid: {0}")]
    SecretInvalid(#[from] SecretError),

    #[error(transparent)]
    MissingHeaders(#[from] MissingHeaders),

    #[error("Webhook verification failed: {0}")]
    Verification(#[from] SignatureError),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] EventError),

    #[error("Failed to persist user change: {0}")]
    Persistence(#[from] StoreError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::SecretMissing | WebhookError::SecretInvalid(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::MissingHeaders(_)
            | WebhookError::Verification(_)
            | WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::SecretMissing => "Webhook secret not configured",
            WebhookError::SecretInvalid(_) => "Webhook secret is invalid",
            WebhookError::MissingHeaders(_) => "Missing webhook headers",
            WebhookError::Verification(_) => "Webhook verification failed",
            WebhookError::InvalidPayload(_) => "Invalid webhook payload",
            WebhookError::Persistence(_) => "Failed to persist user change",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(WebhookResponse::failure(self.public_message())),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WebhookError::SecretMissing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebhookError::from(MissingHeaders {
                missing: vec!["signature"]
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::from(SignatureError::TimestampTooOld).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::from(StoreError::Connection("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = WebhookError::from(StoreError::Connection("mongodb://secret-host".to_string()));
        assert_eq!(err.public_message(), "Failed to persist user change");
        assert!(err.to_string().contains("secret-host"));

        let err = WebhookError::from(SignatureError::NoMatchingSignature);
        assert_eq!(err.public_message(), "Webhook verification failed");
    }
}

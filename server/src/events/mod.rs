//! Verified event parsing and dispatch.
//!
//! ## Processing Flow
//!
//! ```text
//! verified body → UserEvent::parse() → dispatch_event() → UserStore
//! ```
//!
//! Parsing only runs on a body whose signature has already been checked.

pub mod clerk;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{CreateOutcome, StoreError, UserStore};

pub use clerk::{ClerkUser, DeletedUser, EmailAddress, DEFAULT_AVATAR_URL};

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Errors turning a verified body into an event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed {event_type} payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// A user lifecycle event that passed signature verification.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Created(ClerkUser),
    Updated(ClerkUser),
    Deleted(DeletedUser),
    /// Any other event type; acknowledged and ignored.
    Other(String),
}

impl UserEvent {
    /// Parse a `{type, data}` envelope.
    ///
    /// `data` is only interpreted for the three user event types; other
    /// types parse successfully whatever their payload.
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        let envelope: Envelope = serde_json::from_slice(body).map_err(EventError::Envelope)?;
        let Envelope { event_type, data } = envelope;

        let payload_error = |source| EventError::Payload {
            event_type: event_type.clone(),
            source,
        };

        let event = match event_type.as_str() {
            USER_CREATED => UserEvent::Created(serde_json::from_value(data).map_err(payload_error)?),
            USER_UPDATED => UserEvent::Updated(serde_json::from_value(data).map_err(payload_error)?),
            USER_DELETED => UserEvent::Deleted(serde_json::from_value(data).map_err(payload_error)?),
            _ => UserEvent::Other(event_type.clone()),
        };

        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            UserEvent::Created(_) => USER_CREATED,
            UserEvent::Updated(_) => USER_UPDATED,
            UserEvent::Deleted(_) => USER_DELETED,
            UserEvent::Other(t) => t.as_str(),
        }
    }

    /// The provider user id the event refers to, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            UserEvent::Created(u) | UserEvent::Updated(u) => Some(u.id.as_str()),
            UserEvent::Deleted(u) => Some(u.id.as_str()),
            UserEvent::Other(_) => None,
        }
    }
}

/// What a dispatched event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Created,
    /// Duplicate `user.created` delivery; existing record left as is
    AlreadyExists,
    Updated,
    /// `user.updated` for an id with no record
    UpdateMissing,
    Deleted,
    /// `user.deleted` for an id with no record
    DeleteMissing,
    Ignored(String),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Created => "created",
            DispatchOutcome::AlreadyExists => "already_exists",
            DispatchOutcome::Updated => "updated",
            DispatchOutcome::UpdateMissing => "update_missing",
            DispatchOutcome::Deleted => "deleted",
            DispatchOutcome::DeleteMissing => "delete_missing",
            DispatchOutcome::Ignored(_) => "ignored",
        }
    }
}

/// Apply a verified event to the user store.
///
/// Every branch is idempotent: the provider delivers at least once and
/// retries on anything but a 2xx, so redeliveries must succeed.
pub async fn dispatch_event(
    store: &dyn UserStore,
    event: UserEvent,
) -> Result<DispatchOutcome, StoreError> {
    let outcome = match event {
        UserEvent::Created(payload) => {
            let user = payload.to_user();
            match store.create_user(&user).await? {
                CreateOutcome::Inserted => {
                    info!(
                        user_id = %user.id,
                        username = %user.username,
                        has_email = user.email.is_some(),
                        "user_created"
                    );
                    DispatchOutcome::Created
                }
                CreateOutcome::AlreadyExists => {
                    info!(user_id = %user.id, "user_create_duplicate");
                    DispatchOutcome::AlreadyExists
                }
            }
        }
        UserEvent::Updated(payload) => {
            match store.update_user(&payload.id, &payload.to_update()).await? {
                Some(user) => {
                    info!(user_id = %user.id, username = %user.username, "user_updated");
                    DispatchOutcome::Updated
                }
                None => {
                    warn!(user_id = %payload.id, "user_update_not_found");
                    DispatchOutcome::UpdateMissing
                }
            }
        }
        UserEvent::Deleted(payload) => match store.delete_user(&payload.id).await? {
            Some(user) => {
                info!(user_id = %user.id, "user_deleted");
                DispatchOutcome::Deleted
            }
            None => {
                warn!(user_id = %payload.id, "user_delete_not_found");
                DispatchOutcome::DeleteMissing
            }
        },
        UserEvent::Other(event_type) => {
            info!(event_type = %event_type, "webhook_event_ignored");
            DispatchOutcome::Ignored(event_type)
        }
    };

    Ok(outcome)
}

//! HotelBook server - user sync for the hotel booking backend.
//!
//! The storefront keeps its own `users` collection in MongoDB, mirrored from
//! the Clerk identity provider through signed webhooks.
//!
//! ## Architecture
//!
//! ```text
//! Clerk → POST /api/clerk → verify signature → parse event → UserStore
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::WebhookError;
pub use events::{dispatch_event, DispatchOutcome, UserEvent};
pub use store::{MemoryUserStore, MongoUserStore, StoreError, User, UserStore};
pub use web::{router, AppState};

//! User record store.
//!
//! This module provides:
//! - The persisted `User` document and its update shape
//! - The `UserStore` trait the webhook handlers write through
//! - A MongoDB-backed store for production and an in-memory store
//!
//! The store is opened once at startup and shared by every request through
//! `AppState`. Each operation is a single point write keyed by the provider's
//! user id, so no cross-request locking is needed.

pub mod memory;
pub mod mongo;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryUserStore;
pub use mongo::MongoUserStore;
pub use types::{CreateOutcome, User, UserUpdate, USERS_COLLECTION};

/// Errors raised by a user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("failed to encode user document: {0}")]
    Serialization(String),
}

/// Keyed collection of user records.
///
/// All writes are idempotent with respect to redelivery of the same event:
/// creating an existing id is a no-op, updating or deleting a missing id
/// returns `None`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert `user` unless a record with the same id already exists.
    async fn create_user(&self, user: &User) -> Result<CreateOutcome, StoreError>;

    /// Overwrite the mutable fields of `id`, returning the updated record.
    async fn update_user(&self, id: &str, update: &UserUpdate)
        -> Result<Option<User>, StoreError>;

    /// Remove `id`, returning the removed record.
    async fn delete_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release connections on shutdown.
    async fn close(&self) {}
}

//! In-memory user store.
//!
//! Backs the handler tests and local runs without a database. Mutations are
//! counted so callers can assert that a rejected delivery never wrote.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CreateOutcome, StoreError, User, UserStore, UserUpdate};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    mutations: AtomicUsize,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Number of create/update/delete calls received, successful or not.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Seed a record directly, bypassing the mutation counter.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: &User) -> Result<CreateOutcome, StoreError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        users.insert(user.id.clone(), user.clone());
        Ok(CreateOutcome::Inserted)
    }

    async fn update_user(
        &self,
        id: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, StoreError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.write().await;

        Ok(users.get_mut(id).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.write().await.remove(id))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

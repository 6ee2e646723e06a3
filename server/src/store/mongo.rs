//! MongoDB-backed user store.
//!
//! The driver's `Client` pools connections internally, so a single store is
//! created at startup and cloned handles are shared across requests.

use async_trait::async_trait;
use mongodb::{
    bson::{self, doc},
    options::ReturnDocument,
    Client, Collection, Database,
};
use tracing::info;

use super::{CreateOutcome, StoreError, User, UserStore, UserUpdate, USERS_COLLECTION};
use crate::config::DEFAULT_DATABASE;

#[derive(Clone)]
pub struct MongoUserStore {
    client: Client,
    database: Database,
    users: Collection<User>,
}

impl MongoUserStore {
    /// Connect to MongoDB and verify the server answers a ping.
    ///
    /// `database` overrides the database named in the connection string; if
    /// neither is given, `DEFAULT_DATABASE` is used.
    pub async fn connect(url: &str, database: Option<&str>) -> Result<Self, StoreError> {
        info!("mongodb_connecting");

        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let database = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(
            database = %database.name(),
            collection = USERS_COLLECTION,
            "mongodb_connected"
        );

        let users = database.collection::<User>(USERS_COLLECTION);

        Ok(Self {
            client,
            database,
            users,
        })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create_user(&self, user: &User) -> Result<CreateOutcome, StoreError> {
        let mut document =
            bson::to_document(user).map_err(|e| StoreError::Serialization(e.to_string()))?;
        // The filter supplies `_id` on insert
        document.remove("_id");

        // Upsert with $setOnInsert leaves an existing record untouched
        let result = self
            .users
            .update_one(doc! { "_id": user.id.as_str() }, doc! { "$setOnInsert": document })
            .upsert(true)
            .await?;

        if result.upserted_id.is_some() {
            Ok(CreateOutcome::Inserted)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn update_user(
        &self,
        id: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>, StoreError> {
        let changes = doc! {
            "$set": {
                "email": update.email.clone(),
                "username": update.username.as_str(),
                "image": update.image.as_str(),
            }
        };

        let updated = self
            .users
            .find_one_and_update(doc! { "_id": id }, changes)
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated)
    }

    async fn delete_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one_and_delete(doc! { "_id": id }).await?)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("mongodb_client_closed");
    }
}

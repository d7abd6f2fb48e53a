// User repository; also the identity store behind the credential verifier

use async_trait::async_trait;
use chrono::Utc;

use super::memory_store::{MemoryStore, StoreError, Table};
use crate::models::user::User;
use crate::services::credentials::{Identity, IdentityStore, StoredCredentials};

#[derive(Debug, Default)]
pub struct UserRepository {
    store: MemoryStore<Table<User>>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user; the email must already be normalized
    pub async fn insert(
        &self,
        email: String,
        password_hash: String,
        display_name: String,
    ) -> Result<User, StoreError> {
        let mut table = self.store.write().await;
        if table.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate("Email"));
        }

        let now = Utc::now();
        let user = table.insert_with(|id| User {
            id,
            email,
            password_hash,
            display_name,
            created_at: now,
            updated_at: now,
        });
        Ok(user.clone())
    }

    pub async fn find_by_id(&self, id: i64) -> Option<User> {
        self.store.read().await.get(id).cloned()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        self.store
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub async fn exists(&self, id: i64) -> bool {
        self.store.read().await.contains(id)
    }

    pub async fn list(&self) -> Vec<User> {
        self.store.read().await.values().cloned().collect()
    }

    /// Apply `change` to the user under the write lock
    pub async fn update<F>(&self, id: i64, change: F) -> Result<User, StoreError>
    where
        F: FnOnce(&mut User),
    {
        let mut table = self.store.write().await;
        let user = table.get_mut(id).ok_or(StoreError::NotFound("User"))?;
        change(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.store
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("User"))
    }
}

fn identity_of(user: &User) -> Identity {
    Identity {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
    }
}

#[async_trait]
impl IdentityStore for UserRepository {
    async fn find_credentials_by_email(&self, email: &str) -> Option<StoredCredentials> {
        self.find_by_email(email).await.map(|user| StoredCredentials {
            identity: identity_of(&user),
            password_hash: user.password_hash,
        })
    }

    async fn find_identity_by_id(&self, id: i64) -> Option<Identity> {
        self.find_by_id(id).await.as_ref().map(identity_of)
    }
}

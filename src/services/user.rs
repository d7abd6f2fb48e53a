// User registration and profile management

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::{ItemRepository, StoreError, UserRepository};
use crate::models::user::{UpdateUserRequest, User};
use crate::utils::password::{hash_password_with_config, PasswordConfig, PasswordError};
use crate::utils::{normalize_email, trim_and_validate_field, ServiceError};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl From<StoreError> for UserError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(_) => UserError::EmailTaken,
            StoreError::NotFound(_) => UserError::NotFound,
            StoreError::Invalid(msg) => UserError::Validation(msg),
        }
    }
}

impl From<UserError> for ServiceError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::EmailTaken => ServiceError::Conflict("Email already registered".to_string()),
            UserError::NotFound => ServiceError::NotFound("User"),
            UserError::Validation(msg) => ServiceError::ValidationError(msg),
            UserError::Password(e) => e.into(),
        }
    }
}

pub struct UserService {
    users: Arc<UserRepository>,
    items: Arc<ItemRepository>,
    password_config: PasswordConfig,
}

impl UserService {
    pub fn new(users: Arc<UserRepository>, items: Arc<ItemRepository>) -> Self {
        Self::with_password_config(users, items, PasswordConfig::default())
    }

    pub fn with_password_config(
        users: Arc<UserRepository>,
        items: Arc<ItemRepository>,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            users,
            items,
            password_config,
        }
    }

    fn hash(&self, password: &str) -> Result<String, UserError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(hash_password_with_config(password, &self.password_config)?)
    }

    /// Register a user; the email is trimmed and lowercased and must be unique
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, UserError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(UserError::Validation("Email cannot be empty".to_string()));
        }
        let display_name =
            trim_and_validate_field(display_name, "Display name", true).map_err(UserError::Validation)?;

        // Cheap duplicate check before paying for the hash; insert re-checks under the lock
        if self.users.find_by_email(&email).await.is_some() {
            return Err(UserError::EmailTaken);
        }

        let password_hash = self.hash(password)?;
        let user = self.users.insert(email, password_hash, display_name).await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserError> {
        self.users.find_by_id(id).await.ok_or(UserError::NotFound)
    }

    pub async fn list(&self) -> Vec<User> {
        self.users.list().await
    }

    pub async fn update(&self, id: i64, request: &UpdateUserRequest) -> Result<User, UserError> {
        let display_name = match &request.display_name {
            Some(name) => Some(
                trim_and_validate_field(name, "Display name", true).map_err(UserError::Validation)?,
            ),
            None => None,
        };
        let password_hash = match &request.password {
            Some(password) => Some(self.hash(password)?),
            None => None,
        };

        let user = self
            .users
            .update(id, |user| {
                if let Some(name) = display_name {
                    user.display_name = name;
                }
                if let Some(hash) = password_hash {
                    user.password_hash = hash;
                }
            })
            .await?;
        Ok(user)
    }

    /// Delete a user and their item holdings
    pub async fn delete(&self, id: i64) -> Result<(), UserError> {
        self.users.delete(id).await?;
        self.items.clear_holdings(id).await;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn exists(&self, id: i64) -> bool {
        self.users.exists(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::verify_password;

    fn service() -> UserService {
        UserService::with_password_config(
            Arc::new(UserRepository::new()),
            Arc::new(ItemRepository::new()),
            PasswordConfig {
                memory_cost: 4096,
                time_cost: 1,
                parallelism: 1,
                output_length: 32,
            },
        )
    }

    #[tokio::test]
    async fn test_register_normalizes_and_hashes() {
        let svc = service();
        let user = svc
            .register("  U@X.com ", "secret123", " U ")
            .await
            .expect("register");

        assert_eq!(user.email, "u@x.com");
        assert_eq!(user.display_name, "U");
        assert!(verify_password("secret123", &user.password_hash).expect("verify"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let svc = service();
        svc.register("u@x.com", "secret123", "U").await.expect("register");

        assert!(matches!(
            svc.register("U@x.com", "secret123", "U").await,
            Err(UserError::EmailTaken)
        ));
        assert!(matches!(
            svc.register("v@x.com", "short", "V").await,
            Err(UserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_password() {
        let svc = service();
        let user = svc.register("u@x.com", "secret123", "U").await.expect("register");

        let request = UpdateUserRequest {
            display_name: None,
            password: Some("new-secret-1".to_string()),
        };
        let updated = svc.update(user.id, &request).await.expect("update");

        assert!(verify_password("new-secret-1", &updated.password_hash).expect("verify"));
        assert_eq!(updated.display_name, "U");
    }
}

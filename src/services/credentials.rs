// Email/password verification against the user identity store

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::utils::password::{verify_password, PasswordError};

/// Minimal identity returned on successful authentication. Carries no password material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

/// What the identity store hands the verifier for one email
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub identity: Identity,
    pub password_hash: String,
}

/// Lookup contract the credential verifier depends on.
///
/// Implemented by the user repository; authentication never touches user
/// storage except through this trait.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_credentials_by_email(&self, email: &str) -> Option<StoredCredentials>;

    async fn find_identity_by_id(&self, id: i64) -> Option<Identity>;
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No identity registered for this email")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Stored password hash is unusable: {0}")]
    Hash(#[from] PasswordError),
}

impl CredentialError {
    /// Log discriminator; the client never sees the difference
    pub fn log_reason(&self) -> &'static str {
        match self {
            CredentialError::NotFound => "unknown_email",
            CredentialError::InvalidCredentials => "wrong_password",
            CredentialError::Hash(_) => "corrupt_hash",
        }
    }
}

#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn IdentityStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Check an email/password pair.
    ///
    /// The email must match the stored record exactly; callers normalize it
    /// first. Timing is dominated by the Argon2 comparison.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Identity, CredentialError> {
        let stored = self
            .store
            .find_credentials_by_email(email)
            .await
            .ok_or(CredentialError::NotFound)?;

        if verify_password(password, &stored.password_hash)? {
            Ok(stored.identity)
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    pub async fn identity(&self, id: i64) -> Option<Identity> {
        self.store.find_identity_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::password::{hash_password_with_config, PasswordConfig};
    use std::collections::HashMap;

    struct FixedStore {
        records: HashMap<String, StoredCredentials>,
    }

    #[async_trait]
    impl IdentityStore for FixedStore {
        async fn find_credentials_by_email(&self, email: &str) -> Option<StoredCredentials> {
            self.records.get(email).cloned()
        }

        async fn find_identity_by_id(&self, id: i64) -> Option<Identity> {
            self.records
                .values()
                .find(|r| r.identity.id == id)
                .map(|r| r.identity.clone())
        }
    }

    fn verifier_with(email: &str, hash: String) -> CredentialVerifier {
        let identity = Identity {
            id: 1,
            email: email.to_string(),
            display_name: "U".to_string(),
        };
        let records = HashMap::from([(
            email.to_string(),
            StoredCredentials {
                identity,
                password_hash: hash,
            },
        )]);
        CredentialVerifier::new(Arc::new(FixedStore { records }))
    }

    fn fast_hash(password: &str) -> String {
        let config = PasswordConfig {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_length: 32,
        };
        hash_password_with_config(password, &config).expect("hash")
    }

    #[tokio::test]
    async fn test_verify_outcomes() {
        let verifier = verifier_with("u@x.com", fast_hash("secret123"));

        let identity = verifier
            .verify("u@x.com", "secret123")
            .await
            .expect("correct password");
        assert_eq!(identity.id, 1);

        assert!(matches!(
            verifier.verify("u@x.com", "wrong").await,
            Err(CredentialError::InvalidCredentials)
        ));
        assert!(matches!(
            verifier.verify("nobody@x.com", "whatever").await,
            Err(CredentialError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_email_match_is_exact() {
        let verifier = verifier_with("u@x.com", fast_hash("secret123"));

        assert!(matches!(
            verifier.verify("U@x.com", "secret123").await,
            Err(CredentialError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_distinct() {
        let verifier = verifier_with("u@x.com", "plaintext".to_string());

        let err = verifier.verify("u@x.com", "plaintext").await.unwrap_err();
        assert_eq!(err.log_reason(), "corrupt_hash");
    }
}

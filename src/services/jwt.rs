// Token issuer/verifier
//
// One `JwtService` per token kind. Each instance is closed over its own
// secret, issuer and expiry and stamps its own `TokenType` into every token
// it issues; verification rejects any other type. Callers never pass a kind.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::app_config::TokenSettings;
use crate::models::auth::{TokenClaims, TokenType};

// Error types for JWT operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JwtError {
    #[error("Subject id must be positive")]
    InvalidSubject,

    #[error("Email is required")]
    MissingEmail,

    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Token type mismatch: expected {expected}, found {found}")]
    TokenTypeMismatch {
        expected: TokenType,
        found: TokenType,
    },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Invalid token configuration: {0}")]
    InvalidConfig(String),

    #[error("System clock error: {0}")]
    ClockError(String),
}

impl JwtError {
    /// Short discriminator for logs. Clients see one generic error.
    pub fn log_reason(&self) -> &'static str {
        match self {
            JwtError::Malformed => "malformed_token",
            JwtError::InvalidSignature => "bad_signature",
            JwtError::TokenExpired => "expired",
            JwtError::NotYetValid => "not_yet_valid",
            JwtError::InvalidIssuer => "wrong_issuer",
            JwtError::TokenTypeMismatch { .. } => "wrong_type",
            JwtError::InvalidSubject | JwtError::MissingEmail => "invalid_claims",
            JwtError::EncodingError(_)
            | JwtError::InvalidKeyFormat(_)
            | JwtError::InvalidConfig(_)
            | JwtError::ClockError(_) => "token_error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => JwtError::Malformed,
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
                JwtError::InvalidKeyFormat(err.to_string())
            },
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// Configuration for exactly one token kind
#[derive(Clone)]
pub struct JwtConfig {
    pub token_type: TokenType,
    pub issuer: String,
    pub expiry_seconds: u64,
    pub algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("token_type", &self.token_type)
            .field("issuer", &self.issuer)
            .field("expiry_seconds", &self.expiry_seconds)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    /// Build the config for one token kind. HS256 is the only algorithm.
    pub fn new(
        token_type: TokenType,
        secret: &str,
        issuer: impl Into<String>,
        expiry_seconds: u64,
    ) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidKeyFormat(format!(
                "{} token secret is empty",
                token_type
            )));
        }
        if expiry_seconds == 0 {
            return Err(JwtError::InvalidConfig(format!(
                "{} token expiry must be greater than zero",
                token_type
            )));
        }

        Ok(Self {
            token_type,
            issuer: issuer.into(),
            expiry_seconds,
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Build from the loaded application settings for this kind
    pub fn from_settings(token_type: TokenType, settings: &TokenSettings) -> Result<Self, JwtError> {
        Self::new(
            token_type,
            &settings.secret,
            settings.issuer.clone(),
            settings.expiry,
        )
    }
}

/// Stateless issuer/verifier for a single token kind
#[derive(Debug, Clone)]
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(token_type: TokenType, settings: &TokenSettings) -> Result<Self, JwtError> {
        Ok(Self::new(JwtConfig::from_settings(token_type, settings)?))
    }

    /// The kind this instance issues and accepts
    pub fn token_type(&self) -> TokenType {
        self.config.token_type
    }

    /// Lifetime of issued tokens in seconds
    pub fn expires_in(&self) -> u64 {
        self.config.expiry_seconds
    }

    /// Issue a token for `user_id` at the current time
    pub fn issue(&self, user_id: i64, email: &str, role: Option<&str>) -> Result<String, JwtError> {
        self.issue_at(user_id, email, role, now_unix()?)
    }

    /// Issue a token as of `now` (unix seconds)
    pub fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        role: Option<&str>,
        now: u64,
    ) -> Result<String, JwtError> {
        if user_id <= 0 {
            return Err(JwtError::InvalidSubject);
        }
        if email.trim().is_empty() {
            return Err(JwtError::MissingEmail);
        }

        let exp = now
            .checked_add(self.config.expiry_seconds)
            .ok_or_else(|| JwtError::InvalidConfig("expiry overflows timestamp".to_string()))?;

        let claims = TokenClaims {
            user_id,
            email: email.to_string(),
            role: role.filter(|r| !r.is_empty()).map(str::to_string),
            token_type: self.config.token_type,
            iss: self.config.issuer.clone(),
            iat: now,
            nbf: now,
            exp,
        };

        let token = encode(&Header::new(self.config.algorithm), &claims, &self.config.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        if token.is_empty() {
            return Err(JwtError::EncodingError("signer produced an empty token".to_string()));
        }
        Ok(token)
    }

    /// Verify a token at the current time
    pub fn verify(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.verify_at(token, now_unix()?)
    }

    /// Verify a token as of `now` (unix seconds).
    ///
    /// Signature and issuer are checked first, then `exp`/`nbf` against
    /// `now`, then the token type. A token is expired once `exp <= now`.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<TokenClaims, JwtError> {
        if token.is_empty() {
            return Err(JwtError::Malformed);
        }

        // Temporal claims are checked below against the caller's clock
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, &self.config.decoding_key, &validation)?.claims;

        if claims.exp <= now {
            return Err(JwtError::TokenExpired);
        }
        if now < claims.nbf {
            return Err(JwtError::NotYetValid);
        }

        if claims.token_type != self.config.token_type {
            return Err(JwtError::TokenTypeMismatch {
                expected: self.config.token_type,
                found: claims.token_type,
            });
        }

        Ok(claims)
    }
}

/// Current unix time in seconds
pub fn now_unix() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| JwtError::ClockError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-that-is-long-enough!!";

    fn service(token_type: TokenType) -> JwtService {
        JwtService::new(
            JwtConfig::new(token_type, SECRET, "test-issuer", 3600).expect("valid config"),
        )
    }

    #[test]
    fn test_token_generation() {
        let token = service(TokenType::Access)
            .issue(1, "u@x.com", None)
            .expect("issue");

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_claims_set_by_issuer() {
        let svc = service(TokenType::Admin);
        let token = svc
            .issue_at(9, "a@x.com", Some("admin"), 1_000)
            .expect("issue");
        let claims = svc.verify_at(&token, 1_001).expect("verify");

        assert_eq!(claims.token_type, TokenType::Admin);
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.nbf, 1_000);
        assert_eq!(claims.exp, 4_600);
        assert_eq!(claims.iss, "test-issuer");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_issue_input_checks() {
        let svc = service(TokenType::Access);
        assert_eq!(svc.issue(0, "u@x.com", None), Err(JwtError::InvalidSubject));
        assert_eq!(svc.issue(-4, "u@x.com", None), Err(JwtError::InvalidSubject));
        assert_eq!(svc.issue(1, "  ", None), Err(JwtError::MissingEmail));
    }

    #[test]
    fn test_config_rejects_bad_input() {
        assert!(matches!(
            JwtConfig::new(TokenType::Access, "", "iss", 60),
            Err(JwtError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            JwtConfig::new(TokenType::Access, SECRET, "iss", 0),
            Err(JwtError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_type_checked_after_signature() {
        // Same secret on purpose so only the type discriminator differs
        let access = service(TokenType::Access);
        let refresh = service(TokenType::Refresh);

        let token = access.issue_at(1, "u@x.com", None, 1_000).expect("issue");
        assert_eq!(
            refresh.verify_at(&token, 1_001),
            Err(JwtError::TokenTypeMismatch {
                expected: TokenType::Refresh,
                found: TokenType::Access,
            })
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let svc = service(TokenType::Access);
        let token = svc.issue_at(1, "u@x.com", None, 2_000).expect("issue");

        assert_eq!(svc.verify_at(&token, 1_999), Err(JwtError::NotYetValid));
        assert!(svc.verify_at(&token, 2_000).is_ok());
    }

    #[test]
    fn test_wrong_issuer() {
        let issuer_a = JwtService::new(
            JwtConfig::new(TokenType::Access, SECRET, "issuer-a", 60).expect("config"),
        );
        let issuer_b = JwtService::new(
            JwtConfig::new(TokenType::Access, SECRET, "issuer-b", 60).expect("config"),
        );

        let token = issuer_a.issue_at(1, "u@x.com", None, 100).expect("issue");
        assert_eq!(issuer_b.verify_at(&token, 101), Err(JwtError::InvalidIssuer));
    }

    #[test]
    fn test_log_reasons_are_distinct() {
        let reasons = [
            JwtError::Malformed.log_reason(),
            JwtError::InvalidSignature.log_reason(),
            JwtError::TokenExpired.log_reason(),
            JwtError::NotYetValid.log_reason(),
            JwtError::InvalidIssuer.log_reason(),
            JwtError::TokenTypeMismatch {
                expected: TokenType::Access,
                found: TokenType::Refresh,
            }
            .log_reason(),
        ];
        let unique: std::collections::HashSet<_> = reasons.iter().collect();
        assert_eq!(unique.len(), reasons.len());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let rendered = format!("{:?}", service(TokenType::Access));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(SECRET));
    }
}

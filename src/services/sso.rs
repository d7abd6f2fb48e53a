// Admin login through an external SSO provider (Keycloak)
//
// Flow: `authorization_url` hands the browser a provider URL carrying a
// signed `state`; the callback brings back `code` + `state`, the code is
// exchanged for the provider identity, the admin policy is applied and the
// admin account is provisioned or refreshed.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_config::SsoConfig;
use crate::db::AdminRepository;
use crate::models::admin::AdminAccount;
use crate::services::jwt::now_unix;
use crate::utils::AuthError;

/// Lifetime of a signed `state` value
pub const STATE_TTL_SECONDS: u64 = 600;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SsoError {
    #[error("SSO provider unavailable: {0}")]
    Unavailable(String),

    #[error("SSO provider rejected the request: {0}")]
    Rejected(String),

    #[error("Unexpected SSO provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid or expired SSO state")]
    InvalidState,

    #[error("Identity is not an administrator")]
    NotAdmin,

    #[error("SSO configuration error: {0}")]
    Config(String),
}

impl SsoError {
    pub fn log_reason(&self) -> &'static str {
        match self {
            SsoError::Unavailable(_) => "sso_unavailable",
            SsoError::Rejected(_) => "sso_rejected",
            SsoError::InvalidResponse(_) => "sso_bad_response",
            SsoError::InvalidState => "bad_state",
            SsoError::NotAdmin => "insufficient_role",
            SsoError::Config(_) => "sso_config",
        }
    }
}

impl From<SsoError> for AuthError {
    fn from(error: SsoError) -> Self {
        match error {
            SsoError::Unavailable(_) | SsoError::InvalidResponse(_) => AuthError::SsoUnavailable,
            SsoError::Rejected(_) => AuthError::SsoRejected,
            SsoError::InvalidState => {
                AuthError::ValidationError("Invalid or expired SSO state".to_string())
            },
            SsoError::NotAdmin => AuthError::InsufficientRole,
            SsoError::Config(_) => AuthError::InternalError,
        }
    }
}

/// Identity asserted by the SSO provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SsoIdentity {
    pub subject: String,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
}

/// External identity provider used for admin login
#[async_trait]
pub trait SsoProvider: Send + Sync {
    /// Provider URL the browser is sent to
    fn authorization_url(&self, state: &str) -> Result<String, SsoError>;

    /// Trade an authorization code for the caller's identity
    async fn exchange_code(&self, code: &str) -> Result<SsoIdentity, SsoError>;
}

// =============================================================================
// KEYCLOAK
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct RealmAccess {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    realm_access: Option<RealmAccess>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    groups: Vec<String>,
}

impl From<UserInfoResponse> for SsoIdentity {
    fn from(info: UserInfoResponse) -> Self {
        let mut roles = info.roles;
        if let Some(realm) = info.realm_access {
            roles.extend(realm.roles);
        }
        let email = info.email.unwrap_or_default();
        let display_name = info
            .name
            .or(info.preferred_username)
            .unwrap_or_else(|| email.clone());

        SsoIdentity {
            subject: info.sub,
            email,
            display_name,
            roles,
            groups: info.groups,
        }
    }
}

/// Keycloak OpenID Connect client (authorization code flow)
pub struct KeycloakClient {
    http: reqwest::Client,
    realm_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl KeycloakClient {
    pub fn new(config: &SsoConfig) -> Result<Self, SsoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| SsoError::Config(e.to_string()))?;

        Ok(Self {
            http,
            realm_url: format!(
                "{}/realms/{}",
                config.base_url.trim_end_matches('/'),
                config.realm
            ),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{}", self.realm_url, name)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<SsoIdentity, SsoError> {
        let response = self
            .http
            .get(self.endpoint("userinfo"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response)?;
        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| SsoError::InvalidResponse(e.to_string()))?;
        Ok(info.into())
    }
}

fn transport_error(error: reqwest::Error) -> SsoError {
    SsoError::Unavailable(error.to_string())
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SsoError> {
    let status = response.status();
    if status.is_server_error() {
        return Err(SsoError::Unavailable(format!("provider returned {}", status)));
    }
    if status.is_client_error() {
        return Err(SsoError::Rejected(format!("provider returned {}", status)));
    }
    Ok(response)
}

#[async_trait]
impl SsoProvider for KeycloakClient {
    fn authorization_url(&self, state: &str) -> Result<String, SsoError> {
        let mut url = url::Url::parse(&self.endpoint("auth"))
            .map_err(|e| SsoError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<SsoIdentity, SsoError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoint("token"))
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response)?;
        let tokens: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| SsoError::InvalidResponse(e.to_string()))?;

        self.fetch_userinfo(&tokens.access_token).await
    }
}

// =============================================================================
// ADMIN POLICY
// =============================================================================

/// Decides whether an SSO identity is an administrator
#[derive(Debug, Clone)]
pub struct AdminRolePolicy {
    role: String,
    group: String,
    emails: Vec<String>,
}

impl AdminRolePolicy {
    pub fn new(role: impl Into<String>, group: impl Into<String>, emails: &[String]) -> Self {
        Self {
            role: role.into(),
            group: group.into().trim_start_matches('/').to_string(),
            emails: emails.iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &SsoConfig) -> Self {
        Self::new(
            config.admin_role.clone(),
            config.admin_group.clone(),
            &config.admin_emails,
        )
    }

    /// Admin if the realm role matches, the group matches (leading `/`
    /// ignored), or the email is allow-listed (case-insensitive)
    pub fn is_admin(&self, identity: &SsoIdentity) -> bool {
        let has_role = !self.role.is_empty() && identity.roles.iter().any(|r| *r == self.role);
        let in_group = !self.group.is_empty()
            && identity
                .groups
                .iter()
                .any(|g| g.trim_start_matches('/') == self.group);
        let email = identity.email.trim().to_lowercase();
        let allow_listed = !email.is_empty() && self.emails.iter().any(|e| *e == email);

        has_role || in_group || allow_listed
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    nonce: String,
    iat: u64,
    exp: u64,
}

/// Signs and checks the short-lived `state` round-tripped through the provider.
///
/// The state lives only in the signed token and is not bound to a browser
/// session, so a valid state can be replayed until it expires. The provider's
/// single-use authorization code is the only one-shot check.
#[derive(Clone)]
pub struct SsoStateSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SsoStateSigner {
    pub fn new(secret: &str) -> Result<Self, SsoError> {
        if secret.is_empty() {
            return Err(SsoError::Config("state secret is empty".to_string()));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn issue(&self) -> Result<String, SsoError> {
        let now = now_unix().map_err(|e| SsoError::Config(e.to_string()))?;
        self.issue_at(now)
    }

    pub fn issue_at(&self, now: u64) -> Result<String, SsoError> {
        let claims = StateClaims {
            nonce: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + STATE_TTL_SECONDS,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SsoError::Config(e.to_string()))
    }

    pub fn verify(&self, state: &str) -> Result<(), SsoError> {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        decode::<StateClaims>(state, &self.decoding_key, &validation)
            .map(|_| ())
            .map_err(|_| SsoError::InvalidState)
    }
}

// =============================================================================
// LOGIN SERVICE
// =============================================================================

/// Orchestrates admin SSO login and just-in-time provisioning
pub struct AdminSsoService {
    provider: Arc<dyn SsoProvider>,
    policy: AdminRolePolicy,
    state: SsoStateSigner,
    admins: Arc<AdminRepository>,
}

impl AdminSsoService {
    pub fn new(
        provider: Arc<dyn SsoProvider>,
        policy: AdminRolePolicy,
        state: SsoStateSigner,
        admins: Arc<AdminRepository>,
    ) -> Self {
        Self {
            provider,
            policy,
            state,
            admins,
        }
    }

    /// Provider URL plus the signed state it carries
    pub fn authorization_url(&self) -> Result<(String, String), SsoError> {
        let state = self.state.issue()?;
        let url = self.provider.authorization_url(&state)?;
        Ok((url, state))
    }

    /// Validate the callback, check the admin policy and provision the account
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<AdminAccount, SsoError> {
        self.state.verify(state)?;

        let identity = self.provider.exchange_code(code).await?;
        if identity.subject.is_empty() || identity.email.trim().is_empty() {
            return Err(SsoError::InvalidResponse(
                "identity is missing subject or email".to_string(),
            ));
        }

        if !self.policy.is_admin(&identity) {
            warn!(
                subject = %identity.subject,
                email = %identity.email,
                reason = "insufficient_role",
                "SSO login denied"
            );
            return Err(SsoError::NotAdmin);
        }

        let account = self
            .admins
            .upsert_by_subject(
                &identity.subject,
                &identity.email.trim().to_lowercase(),
                &identity.display_name,
                Utc::now(),
            )
            .await;

        info!(admin_id = account.id, email = %account.email, "Admin SSO login");
        Ok(account)
    }

    pub async fn find_admin(&self, id: i64) -> Option<AdminAccount> {
        self.admins.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SsoIdentity {
        SsoIdentity {
            subject: "kc-1".to_string(),
            email: "Ops@X.com".to_string(),
            display_name: "Ops".to_string(),
            roles: vec![],
            groups: vec![],
        }
    }

    #[test]
    fn test_policy_role_group_email() {
        let policy = AdminRolePolicy::new("admin", "admins", &["ops@x.com".to_string()]);
        let nobody = AdminRolePolicy::new("admin", "admins", &[]);

        assert!(policy.is_admin(&identity()));
        assert!(!nobody.is_admin(&identity()));

        let mut by_role = identity();
        by_role.roles = vec!["admin".to_string()];
        assert!(nobody.is_admin(&by_role));

        let mut by_group = identity();
        by_group.groups = vec!["/admins".to_string()];
        assert!(nobody.is_admin(&by_group));

        let mut other_group = identity();
        other_group.groups = vec!["/users".to_string()];
        assert!(!nobody.is_admin(&other_group));
    }

    #[test]
    fn test_state_round_trip() {
        let signer = SsoStateSigner::new("client-secret").expect("signer");
        let state = signer.issue().expect("issue");
        assert!(signer.verify(&state).is_ok());

        let other = SsoStateSigner::new("other-secret").expect("signer");
        assert_eq!(other.verify(&state), Err(SsoError::InvalidState));
        assert_eq!(signer.verify("garbage"), Err(SsoError::InvalidState));
    }

    #[test]
    fn test_expired_state() {
        let signer = SsoStateSigner::new("client-secret").expect("signer");
        let now = now_unix().expect("clock");
        let state = signer
            .issue_at(now - STATE_TTL_SECONDS - 5)
            .expect("issue");

        assert_eq!(signer.verify(&state), Err(SsoError::InvalidState));
    }

    #[test]
    fn test_userinfo_mapping() {
        let info: UserInfoResponse = serde_json::from_value(serde_json::json!({
            "sub": "kc-9",
            "email": "a@x.com",
            "preferred_username": "alice",
            "realm_access": { "roles": ["admin"] },
            "groups": ["/admins"]
        }))
        .expect("parse");

        let identity = SsoIdentity::from(info);
        assert_eq!(identity.display_name, "alice");
        assert_eq!(identity.roles, vec!["admin".to_string()]);
        assert_eq!(identity.groups, vec!["/admins".to_string()]);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            AuthError::from(SsoError::Unavailable("x".into())),
            AuthError::SsoUnavailable
        );
        assert_eq!(AuthError::from(SsoError::NotAdmin), AuthError::InsufficientRole);
        assert!(matches!(
            AuthError::from(SsoError::InvalidState),
            AuthError::ValidationError(_)
        ));
    }

    #[test]
    fn test_keycloak_auth_url() {
        let config = SsoConfig {
            base_url: "http://kc.local:8080".to_string(),
            realm: "rewards".to_string(),
            client_id: "reward-admin".to_string(),
            client_secret: "s".to_string(),
            redirect_uri: "http://localhost:3000/cb".to_string(),
            admin_role: "admin".to_string(),
            admin_group: "admins".to_string(),
            admin_emails: vec![],
            http_timeout_seconds: 5,
        };
        let client = KeycloakClient::new(&config).expect("client");
        let url = client.authorization_url("st").expect("url");

        assert!(url.starts_with(
            "http://kc.local:8080/realms/rewards/protocol/openid-connect/auth?"
        ));
        assert!(url.contains("client_id=reward-admin"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=st"));
        assert!(url.contains("scope=openid+email+profile"));
    }
}

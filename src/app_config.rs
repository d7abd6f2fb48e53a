// Centralized configuration management for the Item Reward API
// Every environment variable is read once at startup; nothing reads the env per request

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "item_reward_api=info,tower_http=info";

/// Minimum length accepted for any token signing secret
const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub sso: SsoConfig,
    pub security: SecurityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub environment: Environment,
    /// Tracing filter directives used when `RUST_LOG` is set
    pub rust_log: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for one kind of token (access, refresh or admin)
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub issuer: String,
    pub expiry: u64,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// JWT configuration, one block per token kind
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access: TokenSettings,
    pub refresh: TokenSettings,
    pub admin: TokenSettings,
}

/// External SSO (Keycloak) configuration used for admin login
#[derive(Clone)]
pub struct SsoConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub admin_role: String,
    pub admin_group: String,
    pub admin_emails: Vec<String>,
    pub http_timeout_seconds: u64,
}

impl std::fmt::Debug for SsoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("admin_role", &self.admin_role)
            .field("admin_group", &self.admin_group)
            .field("admin_emails", &self.admin_emails)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_per_second: u32,
    pub rate_limit_burst: u32,
    /// How often idle client buckets are evicted
    pub rate_limit_prune_seconds: u64,
    /// Key clients by `X-Forwarded-For`; only behind a proxy that sets it
    pub trust_forwarded_for: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Helper function to get required var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // Helper function to get optional var with default
        let get_or_default =
            |key: &str, default: &str| -> String { lookup(key).unwrap_or_else(|| default.to_string()) };

        let parse_u32_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let required_secret = |key: &str| -> Result<String, ConfigError> {
            let secret = get_required(key)?;
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    format!("Secret must be at least {} characters long", MIN_SECRET_LENGTH),
                ));
            }
            Ok(secret)
        };

        let positive_u64 = |key: &str, default: &str| -> Result<u64, ConfigError> {
            let expiry = parse_u64_or_default(key, default)?;
            if expiry == 0 {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
            Ok(expiry)
        };

        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        if bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .is_none()
        {
            return Err(ConfigError::InvalidValue(
                "BIND_ADDRESS".to_string(),
                "missing port".to_string(),
            ));
        }

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));
        let rust_log = get_or_default("RUST_LOG", DEFAULT_LOG_FILTER);

        // Token secrets, one per kind
        let access_secret = required_secret("JWT_ACCESS_SECRET")?;
        let refresh_secret = required_secret("JWT_REFRESH_SECRET")?;
        let admin_secret = required_secret("JWT_ADMIN_SECRET")?;

        if access_secret == refresh_secret {
            return Err(ConfigError::InvalidValue(
                "JWT_REFRESH_SECRET".to_string(),
                "must differ from JWT_ACCESS_SECRET".to_string(),
            ));
        }
        if admin_secret == access_secret || admin_secret == refresh_secret {
            return Err(ConfigError::InvalidValue(
                "JWT_ADMIN_SECRET".to_string(),
                "must differ from the user token secrets".to_string(),
            ));
        }

        let default_issuer = get_or_default("JWT_ISSUER", "item-reward-api");

        let jwt = JwtConfig {
            access: TokenSettings {
                secret: access_secret,
                issuer: lookup("JWT_ACCESS_ISSUER").unwrap_or_else(|| default_issuer.clone()),
                expiry: positive_u64("JWT_ACCESS_EXPIRY", "3600")?,
            },
            refresh: TokenSettings {
                secret: refresh_secret,
                issuer: lookup("JWT_REFRESH_ISSUER").unwrap_or_else(|| default_issuer.clone()),
                expiry: positive_u64("JWT_REFRESH_EXPIRY", "604800")?,
            },
            admin: TokenSettings {
                secret: admin_secret,
                issuer: lookup("JWT_ADMIN_ISSUER").unwrap_or_else(|| default_issuer.clone()),
                expiry: positive_u64("JWT_ADMIN_EXPIRY", "3600")?,
            },
        };

        // SSO provider
        let base_url = get_required("KEYCLOAK_BASE_URL")?;
        if url::Url::parse(&base_url).is_err() {
            return Err(ConfigError::InvalidValue(
                "KEYCLOAK_BASE_URL".to_string(),
                "not an absolute URL".to_string(),
            ));
        }
        let redirect_uri = get_required("KEYCLOAK_REDIRECT_URI")?;
        if url::Url::parse(&redirect_uri).is_err() {
            return Err(ConfigError::InvalidValue(
                "KEYCLOAK_REDIRECT_URI".to_string(),
                "not an absolute URL".to_string(),
            ));
        }

        let sso = SsoConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            realm: get_required("KEYCLOAK_REALM")?,
            client_id: get_required("KEYCLOAK_CLIENT_ID")?,
            client_secret: get_required("KEYCLOAK_CLIENT_SECRET")?,
            redirect_uri,
            admin_role: get_or_default("SSO_ADMIN_ROLE", "admin"),
            admin_group: get_or_default("SSO_ADMIN_GROUP", "admins"),
            admin_emails: split_list(&get_or_default("SSO_ADMIN_EMAILS", "")),
            http_timeout_seconds: parse_u64_or_default("SSO_HTTP_TIMEOUT_SECONDS", "10")?,
        };

        let rate_limit_per_second = parse_u32_or_default("RATE_LIMIT_PER_SECOND", "100")?;
        let rate_limit_burst = parse_u32_or_default("RATE_LIMIT_BURST", "200")?;
        if rate_limit_per_second == 0 || rate_limit_burst == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_PER_SECOND".to_string(),
                "rate and burst must be greater than zero".to_string(),
            ));
        }

        let security = SecurityConfig {
            enable_rate_limiting: parse_bool_or_default("ENABLE_RATE_LIMITING", "true"),
            rate_limit_per_second,
            rate_limit_burst,
            rate_limit_prune_seconds: positive_u64("RATE_LIMIT_PRUNE_SECONDS", "60")?,
            trust_forwarded_for: parse_bool_or_default("TRUST_FORWARDED_FOR", "false"),
            cors_allowed_origins: split_list(&get_or_default("CORS_ALLOWED_ORIGINS", "*")),
        };

        Ok(Self {
            server: ServerConfig {
                bind_address,
                environment,
                rust_log,
            },
            jwt,
            sso,
            security,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

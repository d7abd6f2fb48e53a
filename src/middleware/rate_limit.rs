// Per-client token bucket over the /api tree

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::{app::AppState, app_config::SecurityConfig, utils::AuthError};

/// Keyed token bucket: `per_second` refill, `burst` capacity per client
pub struct ApiRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    trust_forwarded_for: bool,
}

impl ApiRateLimiter {
    pub fn new(per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
            trust_forwarded_for: false,
        }
    }

    /// Key clients by `X-Forwarded-For` ahead of the peer address
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// `None` when rate limiting is disabled or misconfigured to zero
    pub fn from_config(config: &SecurityConfig) -> Option<Arc<Self>> {
        if !config.enable_rate_limiting {
            return None;
        }
        let per_second = NonZeroU32::new(config.rate_limit_per_second)?;
        let burst = NonZeroU32::new(config.rate_limit_burst)?;
        Some(Arc::new(
            Self::new(per_second, burst).trusting_forwarded_for(config.trust_forwarded_for),
        ))
    }

    /// Take one token for `key`; on rejection, whole seconds until the next one
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let seconds = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            seconds.max(1)
        })
    }

    /// Drop buckets that have refilled completely; returns the number of tracked clients left
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn key_for(&self, peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
        client_key(peer, headers, self.trust_forwarded_for)
    }
}

/// Periodically evict idle client buckets until the process exits
pub fn spawn_pruner(limiter: Arc<ApiRateLimiter>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let remaining = limiter.prune();
            tracing::debug!(tracked_clients = remaining, "Pruned rate limit buckets");
        }
    })
}

/// Client key: peer IP, else first `X-Forwarded-For` entry, else `anonymous`.
///
/// Behind a reverse proxy every peer address is the proxy's, so all clients
/// would share one bucket; with `trust_forwarded_for` the header wins over the
/// peer. Only enable it when the proxy overwrites the header.
pub fn client_key(peer: Option<SocketAddr>, headers: &HeaderMap, trust_forwarded_for: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let peer_ip = peer.map(|addr| addr.ip().to_string());

    let key = if trust_forwarded_for {
        forwarded().or(peer_ip)
    } else {
        peer_ip.or_else(forwarded)
    };
    key.unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(request).await;
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = limiter.key_for(peer, request.headers());

    match limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after_seconds) => {
            tracing::warn!(client = %key, retry_after_seconds, "Rate limit exceeded");
            AuthError::RateLimited {
                retry_after_seconds,
            }
            .into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_burst_then_reject() {
        let limiter = ApiRateLimiter::new(
            NonZeroU32::new(1).expect("non-zero"),
            NonZeroU32::new(2).expect("non-zero"),
        );

        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());
        let retry = limiter.check("1.2.3.4").expect_err("bucket empty");
        assert!(retry >= 1);

        // Other clients have their own bucket
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn test_client_key_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("9.9.9.9, 10.0.0.1"),
        );

        let peer: SocketAddr = "127.0.0.1:4000".parse().expect("addr");
        assert_eq!(client_key(Some(peer), &headers, false), "127.0.0.1");
        assert_eq!(client_key(None, &headers, false), "9.9.9.9");
        assert_eq!(client_key(None, &HeaderMap::new(), false), "anonymous");
    }

    #[test]
    fn test_trusted_proxy_uses_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        let proxy: SocketAddr = "10.0.0.1:4000".parse().expect("addr");

        assert_eq!(client_key(Some(proxy), &headers, true), "9.9.9.9");
        assert_eq!(client_key(Some(proxy), &HeaderMap::new(), true), "10.0.0.1");
    }

    #[test]
    fn test_prune_drops_refilled_buckets() {
        let limiter = ApiRateLimiter::new(
            NonZeroU32::new(100).expect("non-zero"),
            NonZeroU32::new(2).expect("non-zero"),
        );

        for i in 0..500 {
            assert!(limiter.check(&format!("10.1.{}.{}", i / 256, i % 256)).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 500);

        // Two tokens at 100/s refill in 20ms
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(limiter.prune(), 0);
    }

    #[test]
    fn test_prune_keeps_busy_clients() {
        let limiter = ApiRateLimiter::new(
            NonZeroU32::new(1).expect("non-zero"),
            NonZeroU32::new(5).expect("non-zero"),
        );

        assert!(limiter.check("1.1.1.1").is_ok());
        assert_eq!(limiter.prune(), 1);
    }

    #[test]
    fn test_disabled_config() {
        let config = SecurityConfig {
            enable_rate_limiting: false,
            rate_limit_per_second: 10,
            rate_limit_burst: 10,
            rate_limit_prune_seconds: 60,
            trust_forwarded_for: false,
            cors_allowed_origins: vec![],
        };
        assert!(ApiRateLimiter::from_config(&config).is_none());
    }
}

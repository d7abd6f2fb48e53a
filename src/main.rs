use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use item_reward_api::{
    app_config::DEFAULT_LOG_FILTER, build_router, middleware::spawn_pruner, AppConfig, AppState,
};

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Configuration is validated once, before anything else starts
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()));
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        },
    };

    // Initialize tracing
    init_tracing(&config.server.rust_log);

    info!(
        "Starting item reward API on {} ({})",
        config.server.bind_address, config.server.environment
    );
    if !config.security.enable_rate_limiting {
        info!("Rate limiting disabled");
    }

    let bind_address = config.server.bind_address.clone();
    let prune_every = Duration::from_secs(config.security.rate_limit_prune_seconds);
    let state = AppState::new(config).map_err(|e| {
        error!("Failed to initialize application state: {}", e);
        e
    })?;

    if let Some(limiter) = state.rate_limiter.clone() {
        spawn_pruner(limiter, prune_every);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    info!("Listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

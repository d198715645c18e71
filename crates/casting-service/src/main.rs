//! Casting Service
//!
//! Entry point for the casting agency API.

use casting_service::auth::{JwksClient, TokenVerifier};
use casting_service::config::Config;
use casting_service::middleware::AuthState;
use casting_service::observability::metrics::init_metrics_recorder;
use casting_service::repositories::InMemoryRepository;
use casting_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Casting Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        auth_domain = %config.auth_domain,
        audience = %config.audience,
        jwks_url = %config.jwks_url,
        algorithms = ?config.jwt_algorithms,
        bind_address = %config.bind_address,
        "Configuration loaded successfully"
    );

    // Install metrics recorder before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Warm the key cache; a failed prefetch is non-fatal
    let jwks_client = Arc::new(
        JwksClient::with_settings(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
            config.jwks_cache_ttl,
        )
        .with_min_refresh_interval(config.jwks_min_refresh_interval),
    );
    match jwks_client.prefetch().await {
        Ok(count) => info!(key_count = count, "JWKS prefetched"),
        Err(e) => warn!(error = %e, "JWKS prefetch failed, keys will be fetched on first request"),
    }

    let verifier = Arc::new(TokenVerifier::from_config(&config, jwks_client));
    let auth = AuthState::new(verifier);

    let state = Arc::new(AppState {
        repository: Arc::new(InMemoryRepository::new()),
    });

    let app = routes::build_routes(state, auth, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Casting Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.drain_period))
        .await?;

    info!("Casting Service shutdown complete");

    Ok(())
}

/// Env-filtered fmt subscriber; JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "casting_service=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is complete.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}

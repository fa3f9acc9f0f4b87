// Main entry point for the SQL-injection guardrail

use sqli_guardrail::api::{create_router, AppState, VerdictCache};
use sqli_guardrail::config::Config;
use sqli_guardrail::oracle::OpenAiOracleClient;
use sqli_guardrail::state::toggle_store::RedisToggleStore;
use sqli_guardrail::state::verdict_cache::{MokaVerdictCache, NoOpVerdictCache};

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("Starting SQL-injection guardrail");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        failure_mode = %config.failure_mode,
        model = %config.oracle_model,
        verdict_cache = config.verdict_cache_enabled(),
        "Configuration loaded"
    );

    // 3. Connect the toggle store
    let toggle_store = Arc::new(
        RedisToggleStore::new(
            &config.redis_url,
            &config.toggle_key,
            config.redis_connection_timeout_secs,
            config.redis_operation_timeout_secs,
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to initialize Redis toggle store");
            e
        })?,
    );
    info!(key = %toggle_store.key(), "Toggle store initialized");

    // 4. Build the oracle client
    let oracle = Arc::new(
        OpenAiOracleClient::new(
            &config.oracle_base_url,
            config.oracle_api_key.clone(),
            &config.oracle_model,
            config.oracle_timeout_secs,
        )
        .map_err(|e| {
            error!(error = %e, "Failed to create oracle client");
            e
        })?,
    );
    info!(endpoint = %oracle.endpoint(), "Oracle client initialized");

    // 5. Verdict cache (off unless a TTL is configured)
    let cache: Arc<dyn VerdictCache + Send + Sync> = match config.verdict_cache_ttl_secs {
        Some(ttl) => Arc::new(MokaVerdictCache::new(ttl, config.verdict_cache_max_entries)),
        None => Arc::new(NoOpVerdictCache),
    };

    // 6. Assemble application state and router
    let addr = format!("{}:{}", config.bind_address, config.port);
    let app_state = AppState::build(config, toggle_store, oracle, cache)?;
    let router = create_router(&app_state).with_state(app_state);

    // 7. Start HTTP server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %addr, "Failed to bind to address");
            e
        })?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    // Router and state are dropped here, closing the Redis connection and HTTP pool
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}

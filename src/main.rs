use route_gate::{
    AppState,
    config::{AppConfig, Env, SecretSource, load_routes},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads the configuration (fail-fast), initializes logging, builds the
/// gate and serves it.
#[tokio::main]
async fn main() {
    // 1. Configuration
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "route_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gate starting in {:?} mode", config.env);
    if config.secret_source == SecretSource::DevFallback {
        tracing::warn!("JWT_SECRET is not set; verifying with the insecure local development secret");
    }

    // 3. State
    let bind_addr = config.bind_addr;
    let app_state = AppState::new(config);

    #[cfg(unix)]
    spawn_reload_on_sighup(app_state.clone());

    // 4. Server
    let app = create_router(app_state);

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "FATAL: failed to bind {bind_addr}");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}

/// Re-reads `GATE_ROUTES_FILE` on every SIGHUP and swaps the snapshot. A bad
/// file is logged and the running table stays in place.
#[cfg(unix)]
fn spawn_reload_on_sighup(state: AppState) {
    use tokio::signal::unix::{SignalKind, signal};

    let Some(path) = state.config.routes_file.clone() else {
        return;
    };

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGHUP reload unavailable");
            return;
        }
    };

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match load_routes(&path).and_then(|routes| state.gate.reload(routes)) {
                Ok(()) => tracing::info!(path = %path.display(), "routes reloaded on SIGHUP"),
                Err(e) => tracing::error!(error = %e, "route reload rejected, keeping current table"),
            }
        }
    });
}

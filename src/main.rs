use limcard_gate::{
    AppState, RouteRegistry,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, builds the route table and serves the gate.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // 1. Logging first so configuration warnings are visible. RUST_LOG wins, otherwise
    // verbose guard logs.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "limcard_gate=debug,tower_http=info".into());

    match Env::from_env() {
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

    // 2. Configuration (fail-fast in production)
    let config = AppConfig::load();

    tracing::info!(
        "Gate starting in {:?} mode, sessions via {:?}",
        config.env,
        config.session_mode
    );

    // 3. Route table
    let registry = Arc::new(RouteRegistry::limcard().expect("FATAL: invalid route table"));
    tracing::info!(routes = registry.routes().len(), "route table loaded");

    // 4. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(registry, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind listen address. Check BIND_ADDR.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: server terminated unexpectedly");
}

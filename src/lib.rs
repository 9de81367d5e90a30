use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Guard core: route table, session capability, decision rules.
pub mod guard;
pub mod models;
pub mod registry;
pub mod session;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;
use routes::{pages, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use guard::{Navigator, decide, evaluate};
pub use registry::{RegistryState, RouteRegistry};
pub use session::{SessionProvider, SessionState, StaticSessionProvider};

/// ApiDoc
///
/// OpenAPI document for the gate's JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_routes, handlers::check_navigation),
    components(
        schemas(
            models::Role, models::Access, models::RouteDefinition, models::Decision,
            models::Session, models::NavigationResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "limcard-gate", description = "Limcard route authorization gate")
    )
)]
struct ApiDoc;

/// AppState
///
/// The shared, immutable state every request sees.
#[derive(Clone)]
pub struct AppState {
    /// The static route table.
    pub registry: RegistryState,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Connection pool for calls to the Supabase auth API.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(registry: RegistryState, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            http: reqwest::Client::new(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RegistryState {
    fn from_ref(app_state: &AppState) -> RegistryState {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for reqwest::Client {
    fn from_ref(app_state: &AppState) -> reqwest::Client {
        app_state.http.clone()
    }
}

/// create_router
///
/// Assembles the API, the guarded pages and the documentation, then wraps everything in
/// the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Pages last: they own the fallback.
        .merge(pages::page_routes(&state.config))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above so
/// every guard log line can be correlated with its request.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

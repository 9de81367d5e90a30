use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints. Session credentials, when present, only influence the
/// outcome of `/api/navigation`; nothing here rejects a request for lack of them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/routes
        // The route table in match order.
        .route("/api/routes", get(handlers::get_routes))
        // GET /api/navigation?to=...&from=...
        // Guard verdict for a prospective client-side navigation.
        .route("/api/navigation", get(handlers::check_navigation))
}

use crate::{AppConfig, AppState, handlers};
use axum::Router;
use tower_http::services::ServeDir;

/// Page Router Module
///
/// Built SPA assets are served as-is. Every other request falls through to the guard,
/// which answers with the SPA shell or a redirect.
pub fn page_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        // GET /assets/*
        // Hashed bundles emitted by the SPA build; never guarded.
        .nest_service("/assets", ServeDir::new(config.asset_dir()))
        // Any other path is a page load.
        .fallback(handlers::guarded_page)
}

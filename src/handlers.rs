use crate::{
    AppState,
    auth::RequestSession,
    guard::{NavigationError, Navigator},
    models::{ErrorResponse, NavigationResponse, RouteDefinition},
};
use axum::{
    Json,
    body::Body,
    extract::{Query, Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower::util::ServiceExt;
use tower_http::services::ServeFile;

// --- Query Structs ---

/// NavigationQuery
///
/// Query parameters of `GET /api/navigation`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    /// Destination location, e.g. `/user/wallet` or `/card/birthday?ref=home`.
    pub to: String,
    /// Location being left, if the client knows it.
    pub from: Option<String>,
}

/// Maps a navigator failure to its HTTP status.
fn navigation_status(error: &NavigationError) -> StatusCode {
    match error {
        NavigationError::NotFound(_) => StatusCode::NOT_FOUND,
        NavigationError::RedirectLoop { .. } => StatusCode::LOOP_DETECTED,
    }
}

// --- Handlers ---

/// get_routes
///
/// [API Route] Publishes the route table so the client router and the gate agree on
/// paths, names and access annotations.
#[utoipa::path(
    get,
    path = "/api/routes",
    responses((status = 200, description = "Route table, in match order", body = [RouteDefinition]))
)]
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteDefinition>> {
    Json(state.registry.routes().to_vec())
}

/// check_navigation
///
/// [API Route] Runs the guard for a prospective navigation, following redirects until the
/// navigation settles. The client calls this before rendering a view.
#[utoipa::path(
    get,
    path = "/api/navigation",
    params(NavigationQuery),
    responses(
        (status = 200, description = "Navigation settled", body = NavigationResponse),
        (status = 404, description = "No route matches the destination", body = ErrorResponse),
        (status = 508, description = "Redirect loop", body = ErrorResponse)
    )
)]
pub async fn check_navigation(
    State(state): State<AppState>,
    RequestSession(session): RequestSession,
    Query(query): Query<NavigationQuery>,
) -> Result<Json<NavigationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let navigator = Navigator::new(&state.registry, state.config.max_redirects);

    match navigator
        .navigate(&query.to, query.from.as_deref(), &*session)
        .await
    {
        Ok(resolution) => Ok(Json(NavigationResponse {
            decision: resolution.decision(),
            path: resolution.path,
            route: resolution.route,
            redirects: resolution.redirects,
        })),
        Err(e) => Err((
            navigation_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// guarded_page
///
/// [Page Route] Fallback for every page load. The requested path is guarded exactly like a
/// client-side navigation: if it is allowed outright the SPA shell is served, otherwise
/// the browser is sent straight to where the redirect chain settles.
pub async fn guarded_page(
    State(state): State<AppState>,
    RequestSession(session): RequestSession,
    request: Request,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path = request.uri().path().to_string();
    let navigator = Navigator::new(&state.registry, state.config.max_redirects);

    let resolution = match navigator.navigate(&path, None, &*session).await {
        Ok(resolution) => resolution,
        Err(e) => return (navigation_status(&e), e.to_string()).into_response(),
    };

    if !resolution.redirects.is_empty() {
        tracing::info!(requested = %path, location = %resolution.path, "page redirected");
        return Redirect::to(&resolution.path).into_response();
    }

    match ServeFile::new(state.config.index_file()).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

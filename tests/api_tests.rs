use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    routing::get,
};
use limcard_gate::{
    AppConfig, AppState, RouteRegistry, create_router,
    config::{Env, SessionMode},
    models::{Decision, ErrorResponse, NavigationResponse, Role, RouteDefinition},
    session::{
        RemoteSessionProvider, SUPABASE_AUDIENCE, SessionError, SessionProvider, SupabaseClaims,
        UserMetadata,
    },
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tower::util::ServiceExt;
use uuid::Uuid;

// --- Test Utilities ---

const SHELL_HTML: &str = "<!doctype html><div id=\"app\"></div>";
const FAKE_TOKEN: &str = "valid-token";
const FAKE_USER_ID: Uuid = Uuid::from_u128(99);
const TEST_JWT_SECRET: &str = "api-test-secret-value-0987654321";

/// Writes a minimal SPA build into a per-test temp directory.
fn spa_dist(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("limcard-gate-{test_name}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("assets")).unwrap();
    std::fs::write(dir.join("index.html"), SHELL_HTML).unwrap();
    std::fs::write(dir.join("assets").join("app.js"), "console.log('limcard')").unwrap();
    dir
}

fn app(config: AppConfig) -> Router {
    create_router(AppState::new(
        Arc::new(RouteRegistry::limcard().unwrap()),
        config,
    ))
}

fn local_app(test_name: &str) -> Router {
    let mut config = AppConfig::default();
    config.spa_dist = spa_dist(test_name);
    app(config)
}

fn request_to(uri: &str, role: Option<Role>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(role) = role {
        builder = builder
            .header("x-user-id", Uuid::new_v4().to_string())
            .header("x-user-role", role.as_str());
    }
    builder.body(Body::empty()).unwrap()
}

/// Signs a Supabase-style access token carrying `account_type` as the user's `type`.
fn signed_token(account_type: &str) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = SupabaseClaims {
        sub: FAKE_USER_ID,
        aud: SUPABASE_AUDIENCE.to_string(),
        iat: now,
        exp: now + 3600,
        email: None,
        user_metadata: UserMetadata {
            account_type: Some(account_type.to_string()),
        },
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes())).unwrap()
}

fn jwt_app(test_name: &str) -> Router {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.spa_dist = spa_dist(test_name);
    app(config)
}

async fn navigate_with_token(router: Router, to: &str, token: &str) -> NavigationResponse {
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/navigation?to={to}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Stand-in for the Supabase `GET /auth/v1/user` endpoint.
async fn spawn_fake_supabase(account_type: &'static str) -> String {
    let handler = move |headers: HeaderMap| async move {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some(format!("Bearer {FAKE_TOKEN}").as_str());
        let has_key = headers.get("apikey").is_some();

        match (has_key, authorized) {
            (false, _) => Err(StatusCode::BAD_REQUEST),
            (true, false) => Err(StatusCode::UNAUTHORIZED),
            (true, true) => Ok(Json(serde_json::json!({
                "id": FAKE_USER_ID,
                "email": "shop@limcard.test",
                "user_metadata": { "type": account_type },
            }))),
        }
    };

    let router = Router::new().route("/auth/v1/user", get(handler));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

// --- API ---

#[tokio::test]
async fn test_health_check() {
    let response = local_app("health").oneshot(request_to("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_route_table_published() {
    let response = local_app("routes").oneshot(request_to("/api/routes", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let routes: Vec<RouteDefinition> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(routes, RouteRegistry::limcard().unwrap().routes().to_vec());
}

#[tokio::test]
async fn test_navigation_allowed() {
    let response = local_app("nav-allow")
        .oneshot(request_to("/api/navigation?to=/user/wallet&from=/", Some(Role::User)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: NavigationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.decision, Decision::Allow);
    assert_eq!(body.path, "/user/wallet");
    assert_eq!(body.route, "user-wallet");
    assert!(body.redirects.is_empty());
}

#[tokio::test]
async fn test_navigation_anonymous_redirected_to_login() {
    let response = local_app("nav-login")
        .oneshot(request_to("/api/navigation?to=/user/dashboard", None))
        .await
        .unwrap();

    let body: NavigationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.decision, Decision::redirect("/user/login"));
    assert_eq!(body.route, "user-login");
}

#[tokio::test]
async fn test_navigation_business_kept_out_of_guest_pages() {
    let response = local_app("nav-guest")
        .oneshot(request_to("/api/navigation?to=/user/login", Some(Role::Business)))
        .await
        .unwrap();

    let body: NavigationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.decision, Decision::redirect("/business/dashboard"));
    assert_eq!(body.redirects, vec!["/business/dashboard".to_string()]);
}

#[tokio::test]
async fn test_navigation_unknown_account_type_is_signed_out() {
    let token = signed_token("admin");

    let body = navigate_with_token(jwt_app("nav-admin-dash"), "/user/dashboard", &token).await;
    assert_eq!(body.decision, Decision::redirect("/user/login"));
    assert_eq!(body.redirects, vec!["/user/login".to_string()]);

    let body = navigate_with_token(jwt_app("nav-admin-login"), "/user/login", &token).await;
    assert_eq!(body.decision, Decision::Allow);
    assert!(body.redirects.is_empty());

    for to in ["/", "/cards", "/business/dashboard", "/user/wallet"] {
        let body = navigate_with_token(jwt_app("nav-admin"), to, &token).await;
        assert!(
            body.redirects.iter().all(|hop| hop != "/admin/dashboard"),
            "{to}: {:?}",
            body.redirects
        );
        assert!(!body.path.starts_with("/admin"), "{to} settled on {}", body.path);
    }
}

#[tokio::test]
async fn test_navigation_unknown_destination() {
    let response = local_app("nav-404")
        .oneshot(request_to("/api/navigation?to=/gift/unknown", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.error.contains("/gift/unknown"));
}

#[tokio::test]
async fn test_navigation_requires_destination() {
    let response = local_app("nav-bad").oneshot(request_to("/api/navigation", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// --- Pages ---

#[tokio::test]
async fn test_allowed_page_serves_shell() {
    let response = local_app("page-allow")
        .oneshot(request_to("/card/anniversary", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, SHELL_HTML.as_bytes());
}

#[tokio::test]
async fn test_protected_page_redirects() {
    let response = local_app("page-redirect")
        .oneshot(request_to("/business/dashboard", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/business/login");
}

#[tokio::test]
async fn test_cross_area_page_redirects() {
    let response = local_app("page-cross")
        .oneshot(request_to("/user/cards", Some(Role::Business)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/business/dashboard");
}

#[tokio::test]
async fn test_unknown_page_not_found() {
    let response = local_app("page-404").oneshot(request_to("/no/such/page", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_rejects_other_methods() {
    let request = Request::builder()
        .method("POST")
        .uri("/cards")
        .body(Body::empty())
        .unwrap();

    let response = local_app("page-post").oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_assets_served_unguarded() {
    let response = local_app("assets")
        .oneshot(request_to("/assets/app.js", Some(Role::Business)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"console.log('limcard')");
}

// --- Remote session lookup ---

#[tokio::test]
async fn test_remote_provider_reads_user() {
    let url = spawn_fake_supabase("business").await;
    let provider = RemoteSessionProvider::new(
        reqwest::Client::new(),
        &url,
        "anon",
        Some(FAKE_TOKEN.to_string()),
    );

    let session = provider.get_session().await.unwrap().unwrap();

    assert_eq!(session.user_id, FAKE_USER_ID);
    assert_eq!(session.role, Role::Business);
    assert_eq!(session.email.as_deref(), Some("shop@limcard.test"));
}

#[tokio::test]
async fn test_remote_provider_unauthorized_is_anonymous() {
    let url = spawn_fake_supabase("user").await;
    let provider = RemoteSessionProvider::new(
        reqwest::Client::new(),
        &url,
        "anon",
        Some("revoked-token".to_string()),
    );

    assert!(provider.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_provider_surfaces_unknown_role() {
    let url = spawn_fake_supabase("reseller").await;
    let provider = RemoteSessionProvider::new(
        reqwest::Client::new(),
        &url,
        "anon",
        Some(FAKE_TOKEN.to_string()),
    );

    assert!(matches!(provider.get_session().await, Err(SessionError::UnknownRole(_))));
}

#[tokio::test]
async fn test_remote_mode_end_to_end() {
    let url = spawn_fake_supabase("user").await;

    let mut config = AppConfig::default();
    config.env = Env::Production;
    config.session_mode = SessionMode::Remote;
    config.supabase_url = url;
    config.spa_dist = spa_dist("remote");

    let request = Request::builder()
        .method("GET")
        .uri("/api/navigation?to=/business/login")
        .header(header::AUTHORIZATION, format!("Bearer {FAKE_TOKEN}"))
        .body(Body::empty())
        .unwrap();

    let response = app(config).oneshot(request).await.unwrap();
    let body: NavigationResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();

    assert_eq!(body.decision, Decision::redirect("/user/dashboard"));
}

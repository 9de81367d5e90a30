use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use std::{convert::Infallible, sync::Arc};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env, SessionMode},
    models::{Role, Session},
    session::{JwtSessionProvider, RemoteSessionProvider, SessionState, StaticSessionProvider},
};

/// Cookie the Limcard client mirrors its Supabase access token into, so that plain page
/// loads carry the session too.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Local development bypass headers.
pub const BYPASS_USER_HEADER: &str = "x-user-id";
pub const BYPASS_ROLE_HEADER: &str = "x-user-role";

/// RequestSession Extractor Result
///
/// The session provider bound to the incoming request. Handlers hand it to the guard,
/// which decides if and when to actually look the session up.
#[derive(Clone)]
pub struct RequestSession(pub SessionState);

/// RequestSession Extractor Implementation
///
/// Resolution order:
/// 1. Local Bypass: in `Env::Local`, `x-user-id` + `x-user-role` headers yield a fixed session.
/// 2. Token Extraction: `Authorization: Bearer` header, then the access token cookie.
/// 3. Provider Selection: local JWT verification or a remote Supabase lookup, per config.
///
/// Never rejects. Missing or unusable credentials make an anonymous navigation.
impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    reqwest::Client: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(session) = bypass_session(&parts.headers) {
                tracing::debug!(user_id = %session.user_id, role = %session.role, "local session bypass");
                return Ok(RequestSession(Arc::new(StaticSessionProvider::signed_in(session))));
            }
        }

        let token = access_token(&parts.headers);

        let provider: SessionState = match config.session_mode {
            SessionMode::Jwt => Arc::new(JwtSessionProvider::new(token, &config.jwt_secret)),
            SessionMode::Remote => Arc::new(RemoteSessionProvider::new(
                reqwest::Client::from_ref(state),
                &config.supabase_url,
                &config.supabase_anon_key,
                token,
            )),
        };

        Ok(RequestSession(provider))
    }
}

/// Builds a session from the bypass headers. Both must be present and well-formed.
fn bypass_session(headers: &HeaderMap) -> Option<Session> {
    let user_id = headers
        .get(BYPASS_USER_HEADER)?
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value).ok())?;
    let role = headers
        .get(BYPASS_ROLE_HEADER)?
        .to_str()
        .ok()
        .and_then(|value| value.parse::<Role>().ok())?;

    Some(Session::new(user_id, role))
}

/// Pulls the access token from the `Authorization` header or, failing that, the cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

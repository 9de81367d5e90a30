use async_trait::async_trait;
use chrono::DateTime;
use jsonwebtoken::{DecodingKey, Validation, decode};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Role, Session, UnknownRole};

/// Audience Supabase stamps on access tokens issued to signed-in users.
pub const SUPABASE_AUDIENCE: &str = "authenticated";

/// SessionError
///
/// Everything that can go wrong while asking the auth provider for the current session.
/// "Not signed in" is deliberately absent: that is `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("access token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("session carries no account type")]
    MissingRole,
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
    #[error("auth provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("auth provider answered {0}")]
    Rejected(StatusCode),
    #[error("simulated session failure")]
    Simulated,
}

// 1. SessionProvider Contract
/// SessionProvider
///
/// The single capability the guard needs from the outside world: a fresh snapshot of the
/// current session. Implementations must report an anonymous visitor as `Ok(None)`.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, SessionError>;
}

/// SessionState
///
/// A per-request session provider, shareable across await points.
pub type SessionState = Arc<dyn SessionProvider>;

// --- Supabase payloads ---

/// UserMetadata
///
/// The free-form metadata Supabase keeps per user. Limcard stores the account type under
/// `type` at registration time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

impl UserMetadata {
    fn role(&self) -> Result<Role, SessionError> {
        let raw = self
            .account_type
            .as_deref()
            .ok_or(SessionError::MissingRole)?;
        Ok(raw.parse()?)
    }
}

/// SupabaseClaims
///
/// The subset of a Supabase access token's payload the gate reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: Uuid,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// SupabaseUser
///
/// Response body of `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

// 2. Local token verification
/// JwtSessionProvider
///
/// Verifies a Supabase access token with the project's JWT secret, without a network
/// round trip. Signature, expiry and audience are all enforced.
pub struct JwtSessionProvider {
    token: Option<String>,
    decoding_key: DecodingKey,
}

impl JwtSessionProvider {
    pub fn new(token: Option<String>, secret: &str) -> Self {
        Self {
            token,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[SUPABASE_AUDIENCE]);

        let claims = decode::<SupabaseClaims>(token, &self.decoding_key, &validation)?.claims;
        let role = claims.user_metadata.role()?;

        Ok(Some(Session {
            user_id: claims.sub,
            email: claims.email,
            role,
            expires_at: i64::try_from(claims.exp)
                .ok()
                .and_then(|exp| DateTime::from_timestamp(exp, 0)),
        }))
    }
}

// 3. Remote lookup
/// RemoteSessionProvider
///
/// Asks the Supabase auth API who owns the token. Slower than local verification, but it
/// sees revocations and metadata changes immediately.
pub struct RemoteSessionProvider {
    client: reqwest::Client,
    supabase_url: String,
    api_key: String,
    token: Option<String>,
}

impl RemoteSessionProvider {
    pub fn new(
        client: reqwest::Client,
        supabase_url: &str,
        api_key: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            token,
        }
    }
}

#[async_trait]
impl SessionProvider for RemoteSessionProvider {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.supabase_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        // An expired or revoked token is simply a signed-out visitor.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SessionError::Rejected(status));
        }

        let user = response.json::<SupabaseUser>().await?;
        let role = user.user_metadata.role()?;

        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            role,
            expires_at: None,
        }))
    }
}

// 4. Fixed snapshot (local bypass and tests)
/// StaticSessionProvider
///
/// Always returns the same snapshot. Used for the local development bypass and to drive
/// the guard deterministically in tests.
#[derive(Clone, Default)]
pub struct StaticSessionProvider {
    session: Option<Session>,
    /// When true, every lookup fails instead of returning the snapshot.
    pub should_fail: bool,
}

impl StaticSessionProvider {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            session: None,
            should_fail: true,
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        if self.should_fail {
            return Err(SessionError::Simulated);
        }
        Ok(self.session.clone())
    }
}

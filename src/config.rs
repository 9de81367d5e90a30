use std::{env, path::PathBuf};

use crate::guard::DEFAULT_MAX_REDIRECTS;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const LOCAL_ANON_KEY: &str = "local-anon-key";
const LOCAL_SUPABASE_URL: &str = "http://localhost:54321";

/// AppConfig
///
/// Holds the gate's entire configuration state. Loaded once at start-up and shared,
/// immutable, through the application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local session bypass and log format.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the Supabase project (auth API lives under /auth/v1).
    pub supabase_url: String,
    // Public project api key, sent as `apikey` on auth API calls.
    pub supabase_anon_key: String,
    // Secret used to verify Supabase access tokens locally.
    pub jwt_secret: String,
    // How sessions are resolved from an access token.
    pub session_mode: SessionMode,
    // Directory holding the built SPA (index.html and assets/).
    pub spa_dist: PathBuf,
    // Hop limit for the navigator before a navigation is declared a loop.
    pub max_redirects: usize,
}

/// Env
///
/// Defines the runtime context, switching between development conveniences (header
/// bypass, pretty logs) and production behaviour.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// SessionMode
///
/// `Jwt` verifies access tokens with the shared secret; `Remote` asks the Supabase auth
/// API for every navigation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionMode {
    Jwt,
    Remote,
}

impl SessionMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "jwt" => Some(SessionMode::Jwt),
            "remote" => Some(SessionMode::Remote),
            _ => None,
        }
    }
}

impl Env {
    /// Reads `APP_ENV`; anything other than `production` is local.
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        }
    }
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests and state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            supabase_url: LOCAL_SUPABASE_URL.to_string(),
            supabase_anon_key: LOCAL_ANON_KEY.to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_mode: SessionMode::Jwt,
            spa_dist: PathBuf::from("dist"),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when a Supabase credential is missing, so the gate never
    /// starts unable to verify sessions.
    pub fn load() -> Self {
        let env = Env::from_env();

        let required = |key: &str, local_default: &str| match env {
            Env::Production => {
                env::var(key).unwrap_or_else(|_| panic!("FATAL: {key} must be set in production."))
            }
            Env::Local => env::var(key).unwrap_or_else(|_| local_default.to_string()),
        };

        // A limit of 0 would turn every redirect into a reported loop.
        let max_redirects = match env::var("MAX_REDIRECTS") {
            Ok(value) => match value.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    tracing::warn!(
                        value = %value,
                        default = DEFAULT_MAX_REDIRECTS,
                        "MAX_REDIRECTS must be a positive integer, using the default"
                    );
                    DEFAULT_MAX_REDIRECTS
                }
            },
            Err(_) => DEFAULT_MAX_REDIRECTS,
        };

        let session_mode = match env::var("SESSION_MODE") {
            Ok(value) => SessionMode::parse(&value).unwrap_or_else(|| {
                tracing::warn!(
                    value = %value,
                    "unknown SESSION_MODE (expected `jwt` or `remote`), verifying tokens locally"
                );
                SessionMode::Jwt
            }),
            Err(_) => SessionMode::Jwt,
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            supabase_url: required("SUPABASE_URL", LOCAL_SUPABASE_URL),
            supabase_anon_key: required("SUPABASE_ANON_KEY", LOCAL_ANON_KEY),
            jwt_secret: required("SUPABASE_JWT_SECRET", LOCAL_JWT_SECRET),
            session_mode,
            spa_dist: env::var("SPA_DIST")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("dist")),
            max_redirects,
        }
    }

    /// The SPA shell served for every allowed page.
    pub fn index_file(&self) -> PathBuf {
        self.spa_dist.join("index.html")
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.spa_dist.join("assets")
    }
}

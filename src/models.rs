use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Role
///
/// The account type attached to a Limcard session. The auth provider stores it as a
/// free-form `type` string in the user metadata; here it is a closed set so that every
/// redirect target built from it is a real route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Business,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Business => "business",
        }
    }

    /// Landing page of the role's area (`/<role>/dashboard`).
    pub fn dashboard_path(self) -> String {
        format!("/{}/dashboard", self.as_str())
    }

    /// Sign-in page of the role's area (`/<role>/login`).
    pub fn login_path(self) -> String {
        format!("/{}/login", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UnknownRole
///
/// Returned when a role string does not name one of the known account areas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "business" => Ok(Role::Business),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Session
///
/// A read-only snapshot of the signed-in identity, as reported by the auth provider.
/// The gate never creates, refreshes or revokes sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    // Absent when the provider does not report an expiry (e.g. the remote user lookup).
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            email: None,
            role,
            expires_at: None,
        }
    }
}

// --- Routing ---

/// Access
///
/// The access annotation carried by every route. `Unrestricted` is a route with no
/// annotation at all: it is still subject to the cross-area containment rules once a
/// session exists, whereas `Public` short-circuits the guard entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "kebab-case")]
#[ts(export)]
pub enum Access {
    Public,
    GuestOnly,
    RequiresAuth,
    RequiresRole { role: Role },
    Unrestricted,
}

impl Access {
    /// Whether reaching the route needs a signed-in session.
    pub fn requires_session(&self) -> bool {
        matches!(self, Access::RequiresAuth | Access::RequiresRole { .. })
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Access::RequiresRole { role } => Some(*role),
            _ => None,
        }
    }
}

/// RouteDefinition
///
/// One entry of the static route table. `view` is an opaque reference to the client
/// component rendered for the route; the gate never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteDefinition {
    pub path: String,
    pub name: String,
    pub view: String,
    pub access: Access,
}

impl RouteDefinition {
    pub fn new(path: &str, name: &str, view: &str, access: Access) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            view: view.to_string(),
            access,
        }
    }
}

/// Decision
///
/// The only two outcomes of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
#[ts(export)]
pub enum Decision {
    Allow,
    Redirect { to: String },
}

impl Decision {
    pub fn redirect(to: impl Into<String>) -> Self {
        Decision::Redirect { to: to.into() }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

// --- API Payloads ---

/// NavigationResponse
///
/// Output schema of `GET /api/navigation`. `decision` is the verdict on the requested
/// destination; `path` and `route` describe where the navigation settled, and `redirects`
/// lists every redirect target the guard issued on the way.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationResponse {
    pub decision: Decision,
    pub path: String,
    pub route: String,
    pub redirects: Vec<String>,
}

/// ErrorResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

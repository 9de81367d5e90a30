use crate::models::{Access, Role, RouteDefinition};
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

/// RegistryError
///
/// Problems detected while building a route table. The table is static, so any of these
/// is a programming error surfaced at start-up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate route name `{0}`")]
    DuplicateName(String),
    #[error("invalid route pattern `{path}`: {reason}")]
    InvalidPattern { path: String, reason: &'static str },
}

/// One `/`-separated piece of a compiled path pattern.
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Param(String),
}

/// PathPattern
///
/// A compiled route path such as `/customize/:cardId`. Empty segments are dropped at
/// compile time, which is what makes the trailing slash optional when matching.
#[derive(Debug, Clone)]
struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    fn compile(path: &str) -> Result<Self, RegistryError> {
        let invalid = |reason| RegistryError::InvalidPattern {
            path: path.to_string(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            match raw.strip_prefix(':') {
                Some("") => return Err(invalid("empty parameter name")),
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(invalid("repeated parameter name"));
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Static(raw.to_lowercase())),
            }
        }

        Ok(Self { segments })
    }

    /// Matches a path that has already been stripped of its query and fragment.
    ///
    /// On success returns the canonical form of the path alongside the captured params:
    /// a single leading `/`, no empty segments, and static segments spelled as declared.
    fn matches(&self, path: &str) -> Option<(String, BTreeMap<String, String>)> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = BTreeMap::new();
        let mut canonical = String::with_capacity(path.len() + 1);

        for segment in &self.segments {
            let part = parts.next()?;
            canonical.push('/');
            match segment {
                Segment::Static(expected) => {
                    if !part.eq_ignore_ascii_case(expected) {
                        return None;
                    }
                    canonical.push_str(expected);
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                    canonical.push_str(part);
                }
            }
        }

        // Every segment of the request must be consumed.
        if parts.next().is_some() {
            return None;
        }
        if canonical.is_empty() {
            canonical.push('/');
        }
        Some((canonical, params))
    }
}

/// RouteMatch
///
/// The result of resolving a concrete path against the registry: the matched definition,
/// the canonical path (see `PathPattern::matches`) and the captured parameters. The guard's
/// area checks read `path`, so `business/dashboard` and `//Business/dashboard` are both
/// seen as `/business/dashboard`.
#[derive(Debug, Clone)]
pub struct RouteMatch<'r> {
    pub route: &'r RouteDefinition,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

/// RouteRegistry
///
/// The ordered, immutable route table. Lookup by path returns the first definition whose
/// pattern matches, in declaration order.
#[derive(Debug, Clone)]
pub struct RouteRegistry {
    routes: Vec<RouteDefinition>,
    patterns: Vec<PathPattern>,
}

/// RegistryState
///
/// Shared handle to the route table used across the application state.
pub type RegistryState = Arc<RouteRegistry>;

impl RouteRegistry {
    pub fn new(routes: Vec<RouteDefinition>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        let mut patterns = Vec::with_capacity(routes.len());

        for route in &routes {
            if !names.insert(route.name.as_str()) {
                return Err(RegistryError::DuplicateName(route.name.clone()));
            }
            patterns.push(PathPattern::compile(&route.path)?);
        }

        Ok(Self { routes, patterns })
    }

    /// The Limcard client route table.
    pub fn limcard() -> Result<Self, RegistryError> {
        let user = Access::RequiresRole { role: Role::User };
        let business = Access::RequiresRole {
            role: Role::Business,
        };

        Self::new(vec![
            RouteDefinition::new("/", "home", "pages/Home", Access::Unrestricted),
            RouteDefinition::new("/cards", "cards", "pages/card/Cards", Access::Unrestricted),
            RouteDefinition::new(
                "/customize/:cardId",
                "Customize-card",
                "components/CustomizeCard",
                Access::Unrestricted,
            ),
            RouteDefinition::new("/send/", "Send-card", "components/SendCard", Access::Unrestricted),
            RouteDefinition::new("/card/:slug", "ViewCard", "components/ViewCard", Access::Public),
            RouteDefinition::new(
                "/category/:slug",
                "CategoryPage",
                "components/CategoryPage",
                Access::Unrestricted,
            ),
            // User area
            RouteDefinition::new(
                "/user/register",
                "user-register",
                "pages/users/Register",
                Access::GuestOnly,
            ),
            RouteDefinition::new("/user/login", "user-login", "pages/users/Login", Access::GuestOnly),
            RouteDefinition::new("/user/verify", "user-verify", "pages/users/Verify", user),
            RouteDefinition::new(
                "/user/dashboard",
                "user-dashboard",
                "pages/users/Dashboard",
                user,
            ),
            RouteDefinition::new("/user/wallet", "user-wallet", "pages/users/UserWallet", user),
            RouteDefinition::new("/user/cards", "user-cards", "pages/users/UserCards", user),
            // Business area
            RouteDefinition::new(
                "/business/register",
                "business-register",
                "pages/business/Register",
                Access::GuestOnly,
            ),
            RouteDefinition::new(
                "/business/login",
                "business-login",
                "pages/business/Login",
                Access::GuestOnly,
            ),
            RouteDefinition::new(
                "/business/dashboard",
                "business-dashboard",
                "pages/business/Dashboard",
                business,
            ),
        ])
    }

    /// Resolves a concrete location (which may carry a query string or fragment) to the
    /// first matching route.
    pub fn resolve(&self, location: &str) -> Option<RouteMatch<'_>> {
        let path = strip_location(location);

        self.routes
            .iter()
            .zip(&self.patterns)
            .find_map(|(route, pattern)| {
                pattern
                    .matches(path)
                    .map(|(path, params)| RouteMatch {
                        route,
                        path,
                        params,
                    })
            })
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }
}

/// Drops the `?query` and `#fragment` parts of a location.
fn strip_location(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}

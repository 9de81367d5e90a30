use crate::{
    models::{Access, Decision, Role, Session},
    registry::{RouteMatch, RouteRegistry},
    session::SessionProvider,
};

/// Hop limit used when the configuration does not say otherwise.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// NavigationRequest
///
/// One pending navigation: the destination resolved against the registry and, when known,
/// the route being left. Lives only for the duration of a guard evaluation.
#[derive(Debug, Clone)]
pub struct NavigationRequest<'r> {
    pub to: RouteMatch<'r>,
    pub from: Option<RouteMatch<'r>>,
}

/// decide
///
/// The guard's rule table, with the session already fetched. Rules are checked in order
/// and the first one that applies wins:
///
/// 1. `Public` routes are always allowed.
/// 2. `GuestOnly` routes send a signed-in visitor to their own dashboard.
/// 3. Routes needing a session send an anonymous visitor to the login page of the area
///    the path belongs to (`/business/login` or `/user/login`).
/// 4. A role-restricted route sends a visitor of another role to their own dashboard.
/// 5. A `user` may not enter `/business…` paths and a `business` may not enter `/user…`.
/// 6. Everything else is allowed.
pub fn decide(access: &Access, path: &str, session: Option<&Session>) -> Decision {
    if let Access::Public = access {
        return Decision::Allow;
    }

    let session = match (access, session) {
        (Access::GuestOnly, Some(session)) => {
            return Decision::redirect(session.role.dashboard_path());
        }
        (access, None) if access.requires_session() => {
            return Decision::redirect(login_for(path));
        }
        (_, None) => return Decision::Allow,
        (_, Some(session)) => session,
    };

    if let Some(required) = access.required_role() {
        if session.role != required {
            return Decision::redirect(session.role.dashboard_path());
        }
    }

    match session.role {
        Role::User if path.starts_with("/business") => Decision::redirect(Role::User.dashboard_path()),
        Role::Business if path.starts_with("/user") => {
            Decision::redirect(Role::Business.dashboard_path())
        }
        _ => Decision::Allow,
    }
}

/// Login page for an anonymous visitor heading to `path`.
fn login_for(path: &str) -> String {
    if path.starts_with("/business") {
        Role::Business.login_path()
    } else {
        Role::User.login_path()
    }
}

/// evaluate
///
/// Runs the guard for one navigation. The session is only fetched for non-public routes,
/// and a failed lookup counts as "not signed in": evaluation always ends in a decision.
pub async fn evaluate(request: &NavigationRequest<'_>, provider: &dyn SessionProvider) -> Decision {
    let to = &request.to;
    let access = &to.route.access;

    if let Access::Public = access {
        tracing::debug!(to = %to.path, route = %to.route.name, "public route, skipping session lookup");
        return Decision::Allow;
    }

    let session = match provider.get_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, to = %to.path, "session lookup failed, treating visitor as signed out");
            None
        }
    };

    let decision = decide(access, &to.path, session.as_ref());

    tracing::debug!(
        to = %to.path,
        from = request.from.as_ref().map(|from| from.path.as_str()).unwrap_or("-"),
        route = %to.route.name,
        role = session.as_ref().map(|s| s.role.as_str()).unwrap_or("anonymous"),
        ?decision,
        "navigation evaluated"
    );

    decision
}

/// NavigationError
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches `{0}`")]
    NotFound(String),
    #[error("navigation to `{to}` redirected more than {limit} times")]
    RedirectLoop { to: String, limit: usize },
}

/// Resolution
///
/// Where a navigation settled. `redirects` is empty when the destination was allowed
/// outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    pub route: String,
    pub redirects: Vec<String>,
}

impl Resolution {
    /// The guard's verdict on the originally requested destination.
    pub fn decision(&self) -> Decision {
        match self.redirects.is_empty() {
            true => Decision::Allow,
            false => Decision::redirect(self.path.clone()),
        }
    }
}

/// Navigator
///
/// Drives navigations the way the client router does: every redirect issued by the guard
/// starts a new navigation, which is guarded again with a fresh session snapshot.
pub struct Navigator<'r> {
    registry: &'r RouteRegistry,
    max_redirects: usize,
}

impl<'r> Navigator<'r> {
    pub fn new(registry: &'r RouteRegistry, max_redirects: usize) -> Self {
        Self {
            registry,
            max_redirects,
        }
    }

    pub async fn navigate(
        &self,
        to: &str,
        from: Option<&str>,
        provider: &dyn SessionProvider,
    ) -> Result<Resolution, NavigationError> {
        let mut request = NavigationRequest {
            to: self.resolve(to)?,
            from: from.and_then(|from| self.registry.resolve(from)),
        };
        let mut redirects = Vec::new();

        loop {
            match evaluate(&request, provider).await {
                Decision::Allow => {
                    return Ok(Resolution {
                        path: request.to.path,
                        route: request.to.route.name.clone(),
                        redirects,
                    });
                }
                Decision::Redirect { to: target } => {
                    if redirects.len() >= self.max_redirects {
                        tracing::error!(to, limit = self.max_redirects, chain = ?redirects, "redirect loop detected");
                        return Err(NavigationError::RedirectLoop {
                            to: to.to_string(),
                            limit: self.max_redirects,
                        });
                    }
                    let next = self.resolve(&target)?;
                    redirects.push(target);
                    request = NavigationRequest {
                        from: Some(request.to),
                        to: next,
                    };
                }
            }
        }
    }

    fn resolve(&self, path: &str) -> Result<RouteMatch<'r>, NavigationError> {
        self.registry
            .resolve(path)
            .ok_or_else(|| NavigationError::NotFound(path.to_string()))
    }
}

//! Route guard: role-based access to page routes.
//!
//! Every page request is classified by [`decide`], a pure function of the
//! request path and the caller's role (`None` when there is no valid
//! session). Rules are evaluated top to bottom and the first match wins:
//!
//! | Session | Path | Outcome |
//! |---|---|---|
//! | none | not public | redirect `/login` |
//! | valid | public (`/`, `/login`, `/register`, `/signup`) | redirect `/home` |
//! | valid | `/home` | allow |
//! | valid | a role-restricted path, role does not match | redirect `/home` |
//! | any | anything else | allow |
//!
//! The guard never fails a request and never touches the user record.
//! Restricted prefixes are matched with a plain `starts_with`, so
//! `/admin-dashboardx` is restricted just like `/admin-dashboard/x`.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::handlers::auth::{AuthState, Role, authenticate};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/home";

/// Reachable without a session; a signed-in user is sent home instead.
pub const PUBLIC_PATHS: [&str; 4] = ["/", "/login", "/register", "/signup"];

/// Paths the guard never sees: the API, health checks, and static assets.
const EXEMPT_PREFIXES: [&str; 2] = ["/api/", "/static/"];
const EXEMPT_PATHS: [&str; 3] = ["/api", "/health", "/favicon.ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Matcher {
    fn matches(self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => path == expected,
            Self::Prefix(prefix) => path.starts_with(prefix),
        }
    }
}

/// Paths reserved for a single role.
#[derive(Debug)]
struct RoleRule {
    role: Role,
    paths: &'static [Matcher],
}

const ROLE_RULES: [RoleRule; 3] = [
    RoleRule {
        role: Role::Admin,
        paths: &[
            Matcher::Prefix("/admin-dashboard"),
            Matcher::Exact("/conference-creation"),
            Matcher::Exact("/admin-dashboard/create-post"),
        ],
    },
    RoleRule {
        role: Role::Author,
        paths: &[Matcher::Prefix("/author-dashboard")],
    },
    RoleRule {
        role: Role::Reviewer,
        paths: &[
            Matcher::Prefix("/reviewer-dashboard"),
            Matcher::Prefix("/review-paper"),
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

impl Decision {
    #[must_use]
    pub const fn location(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin => Some(LOGIN_PATH),
            Self::RedirectToHome => Some(HOME_PATH),
        }
    }
}

#[must_use]
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Whether the guard skips this path entirely.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Classify a page request. `role` is `None` when there is no valid session.
#[must_use]
pub fn decide(path: &str, role: Option<Role>) -> Decision {
    let Some(role) = role else {
        return if is_public(path) {
            Decision::Allow
        } else {
            Decision::RedirectToLogin
        };
    };

    if is_public(path) {
        return Decision::RedirectToHome;
    }
    if path == HOME_PATH {
        return Decision::Allow;
    }

    let denied = ROLE_RULES.iter().any(|rule| {
        rule.role != role && rule.paths.iter().any(|matcher| matcher.matches(path))
    });
    if denied {
        Decision::RedirectToHome
    } else {
        Decision::Allow
    }
}

/// Axum middleware applying [`decide`] to every non-exempt request.
///
/// On allow, the verified session claims (if any) are attached to the request
/// as an extension for downstream handlers.
pub async fn enforce(
    Extension(auth_state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let claims = authenticate(request.headers(), &auth_state);
    let decision = decide(&path, claims.as_ref().map(|claims| claims.role));

    match decision.location() {
        Some(location) => {
            debug!(path = %path, ?decision, "Route guard redirect");
            Redirect::temporary(location).into_response()
        }
        None => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
    }
}

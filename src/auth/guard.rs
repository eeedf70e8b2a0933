use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::auth::session::{self, ResolvedSession};
use crate::error::AppError;
use crate::AppState;

/// Session resolved once per request by the guard and passed to handlers
/// through request extensions. Never read from ambient state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// What the guard does with a request, as a pure function of the requested
/// path and whether a session was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    RedirectToLogin,
    RedirectToDashboard,
    PassThrough,
}

pub fn decide(path: &str, authenticated: bool) -> GuardDecision {
    if path == "/" {
        return if authenticated {
            GuardDecision::RedirectToDashboard
        } else {
            GuardDecision::RedirectToLogin
        };
    }

    if (path == "/dashboard" || path.starts_with("/dashboard/")) && !authenticated {
        return GuardDecision::RedirectToLogin;
    }

    if path == "/login" && authenticated {
        return GuardDecision::RedirectToDashboard;
    }

    GuardDecision::PassThrough
}

/// Route guard, applied to the whole router ahead of every handler.
///
/// Resolves the session cookie once, decides pass/redirect, inserts the
/// `SessionContext` for downstream handlers, and forwards any rotated session
/// cookie on the outgoing response — including redirects, since tokens may
/// rotate during resolution.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = match jar.get(&state.config.session_cookie_name) {
        Some(cookie) => resolve_or_anonymous(&state, cookie.value()).await,
        None => None,
    };

    let authenticated = resolved.is_some();
    let mut rotated_token = None;

    if let Some(session) = resolved {
        rotated_token = session.rotated_token;
        req.extensions_mut().insert(SessionContext {
            user_id: session.user_id,
            session_id: session.session_id,
        });
    }

    let path = req.uri().path().to_string();
    let mut response = match decide(&path, authenticated) {
        GuardDecision::RedirectToLogin => Redirect::to("/login").into_response(),
        GuardDecision::RedirectToDashboard => Redirect::to("/dashboard").into_response(),
        GuardDecision::PassThrough => next.run(req).await,
    };

    if let Some(token) = rotated_token {
        let cookie = session::session_cookie(&state.config, token);
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// Fail-closed session resolution: a backend error during lookup is logged
/// and the request is treated as anonymous, so protected paths still
/// redirect to login.
async fn resolve_or_anonymous(state: &AppState, raw_token: &str) -> Option<ResolvedSession> {
    match session::resolve_session(&state.db, raw_token, &state.config).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::warn!(error = %e, "Session resolution failed; treating request as anonymous");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_branches_on_auth() {
        assert_eq!(decide("/", false), GuardDecision::RedirectToLogin);
        assert_eq!(decide("/", true), GuardDecision::RedirectToDashboard);
    }

    #[test]
    fn test_protected_prefix_requires_session() {
        assert_eq!(decide("/dashboard", false), GuardDecision::RedirectToLogin);
        assert_eq!(
            decide("/dashboard/settings", false),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(decide("/dashboard", true), GuardDecision::PassThrough);
        assert_eq!(decide("/dashboard/settings", true), GuardDecision::PassThrough);
    }

    #[test]
    fn test_prefix_match_is_path_segment_aware() {
        // /dashboardish is not a protected path
        assert_eq!(decide("/dashboardish", false), GuardDecision::PassThrough);
    }

    #[test]
    fn test_login_redirects_when_authenticated() {
        assert_eq!(decide("/login", true), GuardDecision::RedirectToDashboard);
        assert_eq!(decide("/login", false), GuardDecision::PassThrough);
    }

    #[test]
    fn test_everything_else_passes_through() {
        assert_eq!(decide("/health", false), GuardDecision::PassThrough);
        assert_eq!(decide("/api/dashboard", false), GuardDecision::PassThrough);
        assert_eq!(decide("/api/dashboard", true), GuardDecision::PassThrough);
    }
}

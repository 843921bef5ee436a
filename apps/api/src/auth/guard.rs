//! Cookie-based page guard and the `AuthUser` extractor for API routes.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

use crate::auth::{Claims, AUTH_COOKIE};
use crate::errors::AppError;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// What the request's `auth-token` cookie turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenState {
    Missing,
    Invalid,
    Valid(Claims),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Continue,
    /// Protected page with a good token; claims are forwarded to the handler.
    ContinueAs(Claims),
    /// Public page carrying a bad token; serve it and drop the cookie.
    ContinueAndClearCookie,
    RedirectToLogin { clear_cookie: bool },
    RedirectToDashboard,
}

pub fn is_protected(path: &str) -> bool {
    path == DASHBOARD_PATH || path.starts_with("/dashboard/")
}

fn is_auth_page(path: &str) -> bool {
    path == LOGIN_PATH || path == REGISTER_PATH
}

pub fn decide(path: &str, token: TokenState) -> GuardDecision {
    if is_auth_page(path) {
        return match token {
            TokenState::Valid(_) => GuardDecision::RedirectToDashboard,
            TokenState::Invalid => GuardDecision::ContinueAndClearCookie,
            TokenState::Missing => GuardDecision::Continue,
        };
    }

    if is_protected(path) {
        return match token {
            TokenState::Valid(claims) => GuardDecision::ContinueAs(claims),
            TokenState::Invalid => GuardDecision::RedirectToLogin { clear_cookie: true },
            TokenState::Missing => GuardDecision::RedirectToLogin {
                clear_cookie: false,
            },
        };
    }

    GuardDecision::Continue
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE).path("/").build()
}

fn token_state(state: &AppState, jar: &CookieJar) -> TokenState {
    let Some(cookie) = jar.get(AUTH_COOKIE) else {
        return TokenState::Missing;
    };
    match state.tokens.verify(cookie.value()) {
        Ok(claims) => TokenState::Valid(claims),
        Err(e) => {
            debug!("Rejected auth cookie: {e}");
            TokenState::Invalid
        }
    }
}

/// Middleware applied to the whole router: redirects page requests based on the
/// `auth-token` cookie and forwards verified claims.
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    match decide(&path, token_state(&state, &jar)) {
        GuardDecision::Continue => next.run(req).await,
        GuardDecision::ContinueAs(claims) => {
            debug!("Protected route {path} for user {}", claims.sub);
            let headers = req.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&claims.sub.to_string()) {
                headers.insert("x-user-id", v);
            }
            if let Ok(v) = HeaderValue::from_str(&claims.email) {
                headers.insert("x-user-email", v);
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        GuardDecision::ContinueAndClearCookie => {
            let response = next.run(req).await;
            (jar.remove(removal_cookie()), response).into_response()
        }
        GuardDecision::RedirectToLogin { clear_cookie } => {
            debug!("No valid session for {path}, redirecting to login");
            if clear_cookie {
                (jar.remove(removal_cookie()), Redirect::to(LOGIN_PATH)).into_response()
            } else {
                Redirect::to(LOGIN_PATH).into_response()
            }
        }
        GuardDecision::RedirectToDashboard => Redirect::to(DASHBOARD_PATH).into_response(),
    }
}

/// Middleware for API routes: rejects with 401 unless a valid token is present.
pub async fn require_auth(_user: AuthUser, req: Request, next: Next) -> Response {
    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Verified session claims, from the guard or from the cookie / bearer header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser(claims.clone()));
        }

        let token = bearer_token(&parts.headers).or_else(|| {
            CookieJar::from_headers(&parts.headers)
                .get(AUTH_COOKIE)
                .map(|c| c.value().to_string())
        });
        let Some(token) = token else {
            return Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            ));
        };

        let claims = state.tokens.verify(&token).map_err(|e| {
            debug!("Rejected session token: {e}");
            AppError::Unauthorized("Invalid or expired session".to_string())
        })?;
        parts.extensions.insert(claims.clone());
        Ok(AuthUser(claims))
    }
}

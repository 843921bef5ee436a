use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::guard::{AuthUser, LOGIN_PATH, REGISTER_PATH};
use crate::auth::service::{self, LoginRequest, RegisterRequest};
use crate::auth::AUTH_COOKIE;
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = time::Duration::seconds(state.tokens.ttl().num_seconds());
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(max_age)
        .build()
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = service::register(state.users.as_ref(), req).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful",
            user,
            token: None,
        }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let outcome = service::login(state.users.as_ref(), &state.tokens, req).await?;
    let jar = jar.add(session_cookie(&state, outcome.token.clone()));
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful",
            user: outcome.user,
            token: Some(outcome.token),
        }),
    ))
}

/// POST /api/auth/logout
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, Json(json!({ "message": "Logged out" })))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<User>, AppError> {
    let row = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session user no longer exists".to_string()))?;
    Ok(Json(User::from(row)))
}

/// GET /login
pub async fn handle_login_page() -> Json<Value> {
    Json(json!({
        "page": "login",
        "action": "/api/auth/login",
        "method": "POST",
        "fields": ["email", "password"],
        "alternate": REGISTER_PATH,
    }))
}

/// GET /register
pub async fn handle_register_page() -> Json<Value> {
    Json(json!({
        "page": "register",
        "action": "/api/auth/register",
        "method": "POST",
        "fields": ["name", "email", "password"],
        "alternate": LOGIN_PATH,
    }))
}

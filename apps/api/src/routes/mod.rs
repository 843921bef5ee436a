pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::guard::{require_auth, route_guard};
use crate::auth::handlers as auth;
use crate::customers::handlers as customers;
use crate::dashboard::handlers as dashboard;
use crate::invoices::handlers as invoices;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Data endpoints answer 401 instead of redirecting.
    let api = Router::new()
        .route(
            "/api/customers",
            get(customers::handle_list_customers).post(customers::handle_create_customer),
        )
        .route("/api/customers/names", get(customers::handle_customer_names))
        .route(
            "/api/customers/:id",
            get(customers::handle_get_customer)
                .put(customers::handle_update_customer)
                .delete(customers::handle_delete_customer),
        )
        .route(
            "/api/invoices",
            get(invoices::handle_list_invoices).post(invoices::handle_create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::handle_get_invoice)
                .put(invoices::handle_update_invoice)
                .delete(invoices::handle_delete_invoice),
        )
        .route("/api/dashboard/cards", get(dashboard::handle_cards))
        .route(
            "/api/dashboard/latest-invoices",
            get(dashboard::handle_latest_invoices),
        )
        .route("/api/dashboard/revenue", get(dashboard::handle_revenue))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth API
        .route("/api/auth/register", post(auth::handle_register))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route("/api/auth/me", get(auth::handle_me))
        // Pages, guarded by the auth-token cookie
        .route("/login", get(auth::handle_login_page))
        .route("/register", get(auth::handle_register_page))
        .route("/dashboard", get(dashboard::handle_overview_page))
        .route("/dashboard/invoices", get(dashboard::handle_invoices_page))
        .route("/dashboard/customers", get(dashboard::handle_customers_page))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, HeaderMap, Request, StatusCode},
        response::Response,
        Extension, Json,
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::store::MemoryUserStore;
    use crate::auth::Claims;
    use crate::config::Config;

    /// Router over an in-memory user store. The pool never connects, so these
    /// tests only cover paths that finish before touching customers or invoices.
    fn test_app() -> (Router, AppState) {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let mut state = AppState::new(pool, config);
        state.users = Arc::new(MemoryUserStore::default());
        (build_router(state.clone()), state)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_cookie(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("auth-token={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("auth-token="))
            .map(str::to_string)
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn register_and_login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "name": "User", "email": "user@nextmail.com", "password": "123456" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({ "email": "user@nextmail.com", "password": "123456" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let response = app.oneshot(get_with_cookie("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_returns_400() {
        let (app, state) = test_app();
        register_and_login(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "name": "Again", "email": "user@nextmail.com", "password": "abcdef" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Email already registered");
        assert!(state
            .users
            .find_by_email("user@nextmail.com")
            .await
            .unwrap()
            .is_some_and(|u| u.name == "User"));
    }

    #[tokio::test]
    async fn test_register_never_returns_password() {
        let (app, _) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "name": "User", "email": "user@nextmail.com", "password": "123456" }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["user"].get("password").is_none());
        assert_eq!(body["user"]["email"], "user@nextmail.com");
    }

    #[tokio::test]
    async fn test_login_wrong_password_returns_401_without_cookie() {
        let (app, _) = test_app();
        register_and_login(&app).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({ "email": "user@nextmail.com", "password": "wrong-password" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_login_missing_fields_returns_400() {
        let (app, _) = test_app();
        let response = app
            .oneshot(json_request("POST", "/api/auth/login", json!({ "email": "" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["fields"]["password"].is_array());
    }

    #[tokio::test]
    async fn test_login_sets_http_only_cookie() {
        let (app, _) = test_app();
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "name": "User", "email": "user@nextmail.com", "password": "123456" }),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({ "email": "user@nextmail.com", "password": "123456" }),
            ))
            .await
            .unwrap();
        let cookie = set_cookie(&response).expect("auth-token cookie");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[tokio::test]
    async fn test_me_with_cookie_and_bearer() {
        let (app, _) = test_app();
        let token = register_and_login(&app).await;

        let response = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "user@nextmail.com");

        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_with_cookie("/api/auth/me", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (app, _) = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header(header::COOKIE, "auth-token=some-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response).expect("removal cookie");
        assert!(cookie.starts_with("auth-token=;"));
    }

    #[tokio::test]
    async fn test_dashboard_without_cookie_redirects_to_login() {
        let (app, _) = test_app();
        let response = app
            .oneshot(get_with_cookie("/dashboard/invoices", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_dashboard_with_raw_user_id_cookie_redirects_and_clears() {
        let (app, _) = test_app();
        let fake = Uuid::new_v4().to_string();
        let response = app
            .oneshot(get_with_cookie("/dashboard", Some(&fake)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
        assert!(set_cookie(&response).is_some_and(|c| c.starts_with("auth-token=;")));
    }

    #[tokio::test]
    async fn test_login_page_with_session_redirects_to_dashboard() {
        let (app, _) = test_app();
        let token = register_and_login(&app).await;
        let response = app
            .oneshot(get_with_cookie("/login", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_register_page_with_bad_cookie_is_served_and_cleared() {
        let (app, _) = test_app();
        let response = app
            .oneshot(get_with_cookie("/register", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_some());
        assert_eq!(body_json(response).await["page"], "register");
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let (app, _) = test_app();
        for uri in ["/api/customers", "/api/invoices", "/api/dashboard/cards"] {
            let response = app
                .clone()
                .oneshot(get_with_cookie(uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_invoice_is_rejected_before_the_database() {
        let (app, _) = test_app();
        let token = register_and_login(&app).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/invoices")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("auth-token={token}"))
            .body(Body::from(
                json!({ "customer_id": "nope", "amount": 0, "status": "overdue" }).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "Missing Fields. Failed to Create Invoice."
        );
        let fields = &body["error"]["fields"];
        assert!(fields["customer_id"].is_array());
        assert!(fields["amount"].is_array());
        assert!(fields["status"].is_array());
    }

    #[tokio::test]
    async fn test_invalid_customer_update_is_rejected() {
        let (app, state) = test_app();
        let user = crate::models::user::User {
            id: Uuid::new_v4(),
            name: "User".to_string(),
            email: "user@nextmail.com".to_string(),
        };
        let token = state.tokens.issue(&user).unwrap();

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/customers/{}", Uuid::new_v4()))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({ "name": "", "email": "x" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_bad_request() {
        let (app, _) = test_app();
        let cases = [
            (Some("application/json"), r#"{"email":5,"password":"123456"}"#),
            (Some("application/json"), "not json"),
            (None, r#"{"email":"user@nextmail.com","password":"123456"}"#),
        ];
        for (content_type, body) in cases {
            let mut builder = Request::builder().method("POST").uri("/api/auth/login");
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::from(body)).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], "BAD_REQUEST");
            assert!(body["error"]["message"].is_string());
        }
    }

    #[tokio::test]
    async fn test_malformed_id_gets_json_bad_request() {
        let (app, state) = test_app();
        let user = crate::models::user::User {
            id: Uuid::new_v4(),
            name: "User".to_string(),
            email: "user@nextmail.com".to_string(),
        };
        let token = state.tokens.issue(&user).unwrap();

        for uri in ["/api/customers/not-a-uuid", "/api/invoices/not-a-uuid"] {
            let request = Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn test_guard_forwards_identity_to_protected_handlers() {
        async fn whoami(headers: HeaderMap, Extension(claims): Extension<Claims>) -> Json<Value> {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            Json(json!({
                "x_user_id": header("x-user-id"),
                "x_user_email": header("x-user-email"),
                "claims_sub": claims.sub,
            }))
        }

        let (_, state) = test_app();
        let app = Router::new()
            .route("/dashboard/labs", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), route_guard))
            .with_state(state.clone());

        let user = crate::models::user::User {
            id: Uuid::new_v4(),
            name: "User".to_string(),
            email: "user@nextmail.com".to_string(),
        };
        let token = state.tokens.issue(&user).unwrap();

        let response = app
            .oneshot(get_with_cookie("/dashboard/labs", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["x_user_id"], user.id.to_string());
        assert_eq!(body["x_user_email"], "user@nextmail.com");
        assert_eq!(body["claims_sub"], user.id.to_string());
    }
}

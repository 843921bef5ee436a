use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{PgUserStore, TokenKeys, UserStore};
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// User persistence behind a trait so the auth flow can run against other stores.
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenKeys,
    pub config: Config,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        AppState {
            users: Arc::new(PgUserStore::new(db.clone())),
            tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_days),
            db,
            config,
        }
    }
}

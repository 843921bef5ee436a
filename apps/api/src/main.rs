mod auth;
mod config;
mod customers;
mod dashboard;
mod db;
mod errors;
mod extract;
mod invoices;
mod maintenance;
mod models;
mod pagination;
mod routes;
mod state;
mod validation;

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::maintenance::{Cli, Command};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let command = Cli::parse().into_command();

    if command != Command::Serve {
        dotenvy::dotenv().ok();
        init_tracing(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
        let db = create_pool(&Config::database_url_from_env()?).await?;
        return maintenance::run(command, &db).await;
    }

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    init_tracing(&config.rust_log);

    info!("Starting dashboard API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    info!(
        "Session tokens valid for {} day(s), base URL {}",
        config.token_ttl_days, config.base_url
    );

    let state = AppState::new(db, config.clone());

    let cors = match config.base_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request()),
        Err(_) => CorsLayer::permissive(),
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initializes structured logging. `RUST_LOG` directives win over the configured level.
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_PKG_NAME").replace('-', "_")
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

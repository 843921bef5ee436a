//! One-shot database commands run outside the request path:
//! `dashboard-api <command> [args]`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;

use crate::auth::password::hash_password;
use crate::auth::service::{self, RegisterRequest, UpdateUserRequest};
use crate::auth::{PgUserStore, UserStore};
use crate::db::run_migrations;
use crate::validation::normalize_email;

pub const DEFAULT_USER_NAME: &str = "User";
pub const DEFAULT_USER_EMAIL: &str = "user@nextmail.com";
pub const DEFAULT_USER_PASSWORD: &str = "123456";

/// Command line of the service binary. No subcommand starts the HTTP server.
#[derive(Debug, Parser)]
#[command(name = "dashboard-api", version, about = "Invoice dashboard API and database maintenance")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending migrations
    Migrate,
    /// Create the schema and the default user
    Seed,
    /// Check database connectivity
    Ping,
    /// Register a new user
    AddUser {
        name: String,
        email: String,
        password: String,
    },
    /// Replace a user's password
    ResetPassword { email: String, password: String },
    /// Remove a user
    DeleteUser { email: String },
    /// Report whether a user exists and, given a password, whether it matches
    CheckUser {
        email: String,
        password: Option<String>,
    },
}

/// Runs a maintenance command against `pool`. `Serve` is handled by `main`.
pub async fn run(command: Command, pool: &PgPool) -> Result<()> {
    match command {
        Command::Serve => bail!("serve is not a maintenance command"),
        Command::Migrate => run_migrations(pool).await,
        Command::Seed => seed(pool).await,
        Command::Ping => ping(pool).await,
        Command::AddUser {
            name,
            email,
            password,
        } => add_user(pool, name, email, password).await,
        Command::ResetPassword { email, password } => reset_password(pool, email, password).await,
        Command::DeleteUser { email } => delete_user(pool, &email).await,
        Command::CheckUser { email, password } => {
            check_user(pool, &email, password.as_deref()).await
        }
    }
}

/// Creates the schema and the default login, leaving an existing user untouched.
async fn seed(pool: &PgPool) -> Result<()> {
    run_migrations(pool).await?;

    let hash = hash_password(DEFAULT_USER_PASSWORD.to_string()).await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO users (name, email, password)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(DEFAULT_USER_NAME)
    .bind(DEFAULT_USER_EMAIL)
    .bind(hash)
    .execute(pool)
    .await
    .context("failed to seed default user")?;

    if inserted.rows_affected() > 0 {
        info!("Seeded user {DEFAULT_USER_EMAIL}");
    } else {
        info!("User {DEFAULT_USER_EMAIL} already exists");
    }
    Ok(())
}

async fn ping(pool: &PgPool) -> Result<()> {
    let (now,): (chrono::DateTime<chrono::Utc>,) = sqlx::query_as("SELECT now()")
        .fetch_one(pool)
        .await
        .context("database did not answer")?;
    info!("Connected to database, server time {now}");
    Ok(())
}

async fn add_user(pool: &PgPool, name: String, email: String, password: String) -> Result<()> {
    let store = PgUserStore::new(pool.clone());
    let user = service::register(
        &store,
        RegisterRequest {
            name: Some(name),
            email: Some(email),
            password: Some(password),
        },
    )
    .await?;
    info!("Added user {} <{}>", user.id, user.email);
    Ok(())
}

async fn reset_password(pool: &PgPool, email: String, password: String) -> Result<()> {
    let store = PgUserStore::new(pool.clone());
    let Some(row) = store.find_by_email(&normalize_email(&email)).await? else {
        bail!("User {email} not found");
    };

    service::update_user(
        &store,
        row.id,
        UpdateUserRequest {
            password: Some(password),
            ..Default::default()
        },
    )
    .await?;
    info!("Password updated for {}", row.email);
    Ok(())
}

async fn delete_user(pool: &PgPool, email: &str) -> Result<()> {
    let store = PgUserStore::new(pool.clone());
    let Some(row) = store.find_by_email(&normalize_email(email)).await? else {
        bail!("User {email} not found");
    };
    service::delete_user(&store, row.id).await?;
    info!("Deleted user {}", row.email);
    Ok(())
}

/// Reports whether a user exists and, given a password, whether it matches.
async fn check_user(pool: &PgPool, email: &str, password: Option<&str>) -> Result<()> {
    let store = PgUserStore::new(pool.clone());
    let Some(row) = store.find_by_email(&normalize_email(email)).await? else {
        info!("No user with email {email}");
        return Ok(());
    };
    info!("User exists: {} <{}> ({})", row.name, row.email, row.id);

    if let Some(password) = password {
        let verified = service::verify_credentials(&store, email, password).await?;
        if verified.is_some() {
            info!("Password matches");
        } else {
            info!("Password does not match");
        }
    }
    Ok(())
}

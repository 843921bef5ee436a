use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded schema migrations (users, customers, invoices, revenue).
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `foreign_key_violation`.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Returns true when the error is a database constraint failure with the given SQLSTATE.
pub fn is_constraint_violation(err: &sqlx::Error, sqlstate: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(sqlstate),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::database_error;
    use super::*;

    #[test]
    fn test_constraint_violation_matches_sqlstate() {
        let err = database_error(FOREIGN_KEY_VIOLATION);
        assert!(is_constraint_violation(&err, FOREIGN_KEY_VIOLATION));
        assert!(!is_constraint_violation(&err, UNIQUE_VIOLATION));
        assert!(!is_constraint_violation(&sqlx::Error::RowNotFound, FOREIGN_KEY_VIOLATION));
    }
}

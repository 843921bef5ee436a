use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{is_constraint_violation, UNIQUE_VIOLATION};
use crate::errors::AppError;
use crate::models::user::{NewUser, UserChanges, UserRow};

pub const EMAIL_TAKEN: &str = "Email already registered";

/// Persistence for `users`. Carried in `AppState` as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError>;

    /// Fails with `BadRequest(EMAIL_TAKEN)` when the email is already present.
    async fn insert(&self, user: NewUser) -> Result<UserRow, AppError>;

    /// Applies the provided fields. `Ok(None)` when no user has `id`.
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<UserRow>, AppError>;

    /// `Ok(false)` when no user has `id`.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        PgUserStore { pool }
    }
}

fn map_unique(e: sqlx::Error) -> AppError {
    if is_constraint_violation(&e, UNIQUE_VIOLATION) {
        AppError::BadRequest(EMAIL_TAKEN.to_string())
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        let row =
            sqlx::query_as::<_, UserRow>("SELECT id, name, email, password FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRow, AppError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<UserRow>, AppError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password = COALESCE($4, password)
            WHERE id = $1
            RETURNING id, name, email, password
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// In-process store used by unit and router tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryUserStore {
    rows: tokio::sync::RwLock<Vec<UserRow>>,
}

#[cfg(test)]
impl MemoryUserStore {
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        Ok(self.rows.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRow, AppError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|u| u.email == user.email) {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
        }
        let row = UserRow {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<UserRow>, AppError> {
        let mut rows = self.rows.write().await;
        if let Some(email) = &changes.email {
            if rows.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
            }
        }
        let Some(row) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(email) = changes.email {
            row.email = email;
        }
        if let Some(hash) = changes.password_hash {
            row.password = hash;
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() < before)
    }
}

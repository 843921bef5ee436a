use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::customers::schema::CustomerInput;
use crate::db::{is_constraint_violation, FOREIGN_KEY_VIOLATION};
use crate::errors::AppError;
use crate::models::customer::{CustomerField, CustomerRow, CustomerSummaryRow};
use crate::pagination::{SearchQuery, ITEMS_PER_PAGE};

/// One page of customers matching the search term, newest first, with invoice totals.
pub async fn fetch_filtered_customers(
    pool: &PgPool,
    search: &SearchQuery,
) -> Result<Vec<CustomerSummaryRow>, AppError> {
    let rows = sqlx::query_as::<_, CustomerSummaryRow>(
        r#"
        SELECT
            c.id,
            c.name,
            c.email,
            c.image_url,
            c.created_at,
            c.updated_at,
            COUNT(i.id) AS total_invoices,
            COALESCE(SUM(CASE WHEN i.status = 'pending' THEN i.amount ELSE 0 END), 0)::BIGINT AS total_pending,
            COALESCE(SUM(CASE WHEN i.status = 'paid' THEN i.amount ELSE 0 END), 0)::BIGINT AS total_paid
        FROM customers c
        LEFT JOIN invoices i ON c.id = i.customer_id
        WHERE c.name ILIKE $1 OR c.email ILIKE $1
        GROUP BY c.id
        ORDER BY c.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(search.like_pattern())
    .bind(ITEMS_PER_PAGE)
    .bind(search.offset())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_filtered_customers(pool: &PgPool, search: &SearchQuery) -> Result<i64, AppError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE name ILIKE $1 OR email ILIKE $1")
            .bind(search.like_pattern())
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// All customers as `{id, name}`, alphabetically.
pub async fn fetch_customer_names(pool: &PgPool) -> Result<Vec<CustomerField>, AppError> {
    let rows = sqlx::query_as::<_, CustomerField>("SELECT id, name FROM customers ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn fetch_customer_by_id(pool: &PgPool, id: Uuid) -> Result<CustomerRow, AppError> {
    sqlx::query_as::<_, CustomerRow>(
        "SELECT id, name, email, image_url, created_at, updated_at FROM customers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))
}

pub async fn create_customer(pool: &PgPool, input: &CustomerInput) -> Result<CustomerRow, AppError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        r#"
        INSERT INTO customers (name, email, image_url)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, image_url, created_at, updated_at
        "#,
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.image_url)
    .fetch_one(pool)
    .await?;

    info!("Created customer {}", row.id);
    Ok(row)
}

pub async fn update_customer(
    pool: &PgPool,
    id: Uuid,
    input: &CustomerInput,
) -> Result<CustomerRow, AppError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        r#"
        UPDATE customers
        SET name = $2, email = $3, image_url = $4, updated_at = now()
        WHERE id = $1
        RETURNING id, name, email, image_url, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.image_url)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Customer {id} not found")))?;

    info!("Updated customer {id}");
    Ok(row)
}

fn map_customer_in_use(e: sqlx::Error, id: Uuid) -> AppError {
    if is_constraint_violation(&e, FOREIGN_KEY_VIOLATION) {
        AppError::Conflict(format!("Customer {id} still has invoices"))
    } else {
        AppError::Database(e)
    }
}

/// Customers that still have invoices cannot be deleted.
pub async fn delete_customer(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_customer_in_use(e, id))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Customer {id} not found")));
    }
    info!("Deleted customer {id}");
    Ok(())
}

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::{is_constraint_violation, FOREIGN_KEY_VIOLATION};
use crate::errors::AppError;
use crate::invoices::schema::InvoiceInput;
use crate::models::invoice::{InvoiceRow, InvoiceTableRow};
use crate::pagination::{SearchQuery, ITEMS_PER_PAGE};

// Shared by the page query and the count so both always agree.
const INVOICE_SEARCH_FILTER: &str = r#"
    customers.name ILIKE $1 OR
    customers.email ILIKE $1 OR
    invoices.amount::text ILIKE $1 OR
    invoices.date::text ILIKE $1 OR
    invoices.status ILIKE $1
"#;

/// One page of invoices joined with customers, most recent first.
pub async fn fetch_filtered_invoices(
    pool: &PgPool,
    search: &SearchQuery,
) -> Result<Vec<InvoiceTableRow>, AppError> {
    let sql = format!(
        r#"
        SELECT
            invoices.id,
            invoices.customer_id,
            invoices.amount,
            invoices.date,
            invoices.status,
            customers.name,
            customers.email,
            customers.image_url
        FROM invoices
        JOIN customers ON invoices.customer_id = customers.id
        WHERE {INVOICE_SEARCH_FILTER}
        ORDER BY invoices.date DESC, invoices.id
        LIMIT $2 OFFSET $3
        "#
    );
    let rows = sqlx::query_as::<_, InvoiceTableRow>(&sql)
        .bind(search.like_pattern())
        .bind(ITEMS_PER_PAGE)
        .bind(search.offset())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count_filtered_invoices(pool: &PgPool, search: &SearchQuery) -> Result<i64, AppError> {
    let sql = format!(
        r#"
        SELECT COUNT(*)
        FROM invoices
        JOIN customers ON invoices.customer_id = customers.id
        WHERE {INVOICE_SEARCH_FILTER}
        "#
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(search.like_pattern())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn fetch_invoice_by_id(pool: &PgPool, id: Uuid) -> Result<InvoiceRow, AppError> {
    sqlx::query_as::<_, InvoiceRow>(
        "SELECT id, customer_id, amount, status, date FROM invoices WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {id} not found")))
}

fn map_missing_customer(e: sqlx::Error, customer_id: Uuid) -> AppError {
    if is_constraint_violation(&e, FOREIGN_KEY_VIOLATION) {
        AppError::BadRequest(format!("Customer {customer_id} does not exist"))
    } else {
        AppError::Database(e)
    }
}

/// Inserts an invoice dated today.
pub async fn create_invoice(pool: &PgPool, input: &InvoiceInput) -> Result<InvoiceRow, AppError> {
    let today = Utc::now().date_naive();
    let row = sqlx::query_as::<_, InvoiceRow>(
        r#"
        INSERT INTO invoices (customer_id, amount, status, date)
        VALUES ($1, $2, $3, $4)
        RETURNING id, customer_id, amount, status, date
        "#,
    )
    .bind(input.customer_id)
    .bind(input.amount_cents)
    .bind(input.status.as_str())
    .bind(today)
    .fetch_one(pool)
    .await
    .map_err(|e| map_missing_customer(e, input.customer_id))?;

    info!("Created invoice {} for customer {}", row.id, row.customer_id);
    Ok(row)
}

pub async fn update_invoice(
    pool: &PgPool,
    id: Uuid,
    input: &InvoiceInput,
) -> Result<InvoiceRow, AppError> {
    let row = sqlx::query_as::<_, InvoiceRow>(
        r#"
        UPDATE invoices
        SET customer_id = $2, amount = $3, status = $4
        WHERE id = $1
        RETURNING id, customer_id, amount, status, date
        "#,
    )
    .bind(id)
    .bind(input.customer_id)
    .bind(input.amount_cents)
    .bind(input.status.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_missing_customer(e, input.customer_id))?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {id} not found")))?;

    info!("Updated invoice {id}");
    Ok(row)
}

pub async fn delete_invoice(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Invoice {id} not found")));
    }
    info!("Deleted invoice {id}");
    Ok(())
}

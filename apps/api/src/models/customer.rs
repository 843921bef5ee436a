use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_IMAGE_URL: &str = "/customers/default.png";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer with invoice aggregates computed at query time. Totals are in cents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_invoices: i64,
    pub total_pending: i64,
    pub total_paid: i64,
}

/// Minimal projection used to populate customer pickers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerField {
    pub id: Uuid,
    pub name: String,
}

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown invoice status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Amount in cents.
    pub amount: i32,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

/// Invoice joined with its customer, as shown in the invoices table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceTableRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: i32,
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LatestInvoiceRow {
    pub id: Uuid,
    pub amount: i32,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RevenueRow {
    pub month: String,
    pub revenue: i32,
}

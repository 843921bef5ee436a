use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::invoice::{LatestInvoiceRow, RevenueRow};
use crate::models::money::format_currency;

/// Headline totals. Amounts are cents.
#[derive(Debug, Clone, Serialize)]
pub struct CardTotals {
    pub number_of_customers: i64,
    pub number_of_invoices: i64,
    pub total_paid_invoices: i64,
    pub total_pending_invoices: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardData {
    #[serde(flatten)]
    pub totals: CardTotals,
    pub total_paid_display: String,
    pub total_pending_display: String,
}

impl From<CardTotals> for CardData {
    fn from(totals: CardTotals) -> Self {
        CardData {
            total_paid_display: format_currency(totals.total_paid_invoices),
            total_pending_display: format_currency(totals.total_pending_invoices),
            totals,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestInvoice {
    #[serde(flatten)]
    pub invoice: LatestInvoiceRow,
    pub amount_display: String,
}

pub async fn fetch_card_data(pool: &PgPool) -> Result<CardData, AppError> {
    let (customers, invoices, totals) = tokio::try_join!(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers").fetch_one(pool),
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices").fetch_one(pool),
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0)::BIGINT,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0)::BIGINT
            FROM invoices
            "#,
        )
        .fetch_one(pool),
    )?;

    Ok(CardData::from(CardTotals {
        number_of_customers: customers,
        number_of_invoices: invoices,
        total_paid_invoices: totals.0,
        total_pending_invoices: totals.1,
    }))
}

/// The five most recent invoices.
pub async fn fetch_latest_invoices(pool: &PgPool) -> Result<Vec<LatestInvoice>, AppError> {
    let rows = sqlx::query_as::<_, LatestInvoiceRow>(
        r#"
        SELECT invoices.id, invoices.amount, customers.name, customers.image_url, customers.email
        FROM invoices
        JOIN customers ON invoices.customer_id = customers.id
        ORDER BY invoices.date DESC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|invoice| LatestInvoice {
            amount_display: format_currency(i64::from(invoice.amount)),
            invoice,
        })
        .collect())
}

pub async fn fetch_revenue(pool: &PgPool) -> Result<Vec<RevenueRow>, AppError> {
    let rows = sqlx::query_as::<_, RevenueRow>("SELECT month, revenue FROM revenue")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_data_formats_totals() {
        let card = CardData::from(CardTotals {
            number_of_customers: 10,
            number_of_invoices: 15,
            total_paid_invoices: 1_234_56,
            total_pending_invoices: 0,
        });
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["number_of_customers"], 10);
        assert_eq!(json["total_paid_display"], "$1,234.56");
        assert_eq!(json["total_pending_display"], "$0.00");
    }
}

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::customers::handlers::{load_customers_page, CustomersPage};
use crate::dashboard::queries::{self, CardData, LatestInvoice};
use crate::errors::AppError;
use crate::extract::QueryParams;
use crate::invoices::handlers::{load_invoices_page, InvoicesPage};
use crate::models::invoice::RevenueRow;
use crate::models::user::User;
use crate::pagination::SearchQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Overview {
    pub user: User,
    pub cards: CardData,
    pub latest_invoices: Vec<LatestInvoice>,
    pub revenue: Vec<RevenueRow>,
}

/// GET /api/dashboard/cards
pub async fn handle_cards(State(state): State<AppState>) -> Result<Json<CardData>, AppError> {
    Ok(Json(queries::fetch_card_data(&state.db).await?))
}

/// GET /api/dashboard/latest-invoices
pub async fn handle_latest_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<LatestInvoice>>, AppError> {
    Ok(Json(queries::fetch_latest_invoices(&state.db).await?))
}

/// GET /api/dashboard/revenue
pub async fn handle_revenue(
    State(state): State<AppState>,
) -> Result<Json<Vec<RevenueRow>>, AppError> {
    Ok(Json(queries::fetch_revenue(&state.db).await?))
}

/// GET /dashboard
pub async fn handle_overview_page(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Overview>, AppError> {
    let (cards, latest_invoices, revenue) = tokio::try_join!(
        queries::fetch_card_data(&state.db),
        queries::fetch_latest_invoices(&state.db),
        queries::fetch_revenue(&state.db),
    )?;
    Ok(Json(Overview {
        user: User {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        },
        cards,
        latest_invoices,
        revenue,
    }))
}

/// GET /dashboard/invoices
pub async fn handle_invoices_page(
    State(state): State<AppState>,
    QueryParams(search): QueryParams<SearchQuery>,
) -> Result<Json<InvoicesPage>, AppError> {
    Ok(Json(load_invoices_page(&state, &search).await?))
}

/// GET /dashboard/customers
pub async fn handle_customers_page(
    State(state): State<AppState>,
    QueryParams(search): QueryParams<SearchQuery>,
) -> Result<Json<CustomersPage>, AppError> {
    Ok(Json(load_customers_page(&state, &search).await?))
}

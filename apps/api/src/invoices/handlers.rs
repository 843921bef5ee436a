use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::invoices::queries;
use crate::invoices::schema::{InvoiceAction, InvoiceForm};
use crate::models::invoice::{InvoiceRow, InvoiceStatus, InvoiceTableRow};
use crate::models::money::cents_to_dollars;
use crate::pagination::{total_pages, SearchQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InvoicesPage {
    pub invoices: Vec<InvoiceTableRow>,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Invoice shaped for the edit form: amount in dollars.
#[derive(Debug, Serialize)]
pub struct InvoiceFormView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: f64,
    pub status: InvoiceStatus,
}

impl From<InvoiceRow> for InvoiceFormView {
    fn from(row: InvoiceRow) -> Self {
        InvoiceFormView {
            id: row.id,
            customer_id: row.customer_id,
            amount: cents_to_dollars(i64::from(row.amount)),
            status: row.status,
        }
    }
}

pub async fn load_invoices_page(
    state: &AppState,
    search: &SearchQuery,
) -> Result<InvoicesPage, AppError> {
    let invoices = queries::fetch_filtered_invoices(&state.db, search).await?;
    let total = queries::count_filtered_invoices(&state.db, search).await?;
    Ok(InvoicesPage {
        invoices,
        total_pages: total_pages(total),
        current_page: search.page(),
    })
}

/// GET /api/invoices?query=&page=
pub async fn handle_list_invoices(
    State(state): State<AppState>,
    QueryParams(search): QueryParams<SearchQuery>,
) -> Result<Json<InvoicesPage>, AppError> {
    Ok(Json(load_invoices_page(&state, &search).await?))
}

/// GET /api/invoices/:id
pub async fn handle_get_invoice(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<InvoiceFormView>, AppError> {
    let row = queries::fetch_invoice_by_id(&state.db, id).await?;
    Ok(Json(InvoiceFormView::from(row)))
}

/// POST /api/invoices
pub async fn handle_create_invoice(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<InvoiceForm>,
) -> Result<(StatusCode, Json<InvoiceRow>), AppError> {
    let input = form.validate(InvoiceAction::Create)?;
    let row = queries::create_invoice(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/invoices/:id
pub async fn handle_update_invoice(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(form): JsonBody<InvoiceForm>,
) -> Result<Json<InvoiceRow>, AppError> {
    let input = form.validate(InvoiceAction::Update)?;
    Ok(Json(queries::update_invoice(&state.db, id, &input).await?))
}

/// DELETE /api/invoices/:id
pub async fn handle_delete_invoice(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, AppError> {
    queries::delete_invoice(&state.db, id).await?;
    Ok(Json(json!({ "message": "Deleted Invoice." })))
}

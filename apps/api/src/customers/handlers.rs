use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::customers::queries;
use crate::customers::schema::{CustomerAction, CustomerForm};
use crate::errors::AppError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::models::customer::{CustomerField, CustomerRow, CustomerSummaryRow};
use crate::models::money::format_currency;
use crate::pagination::{total_pages, SearchQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CustomerView {
    #[serde(flatten)]
    pub customer: CustomerSummaryRow,
    pub total_pending_display: String,
    pub total_paid_display: String,
}

impl From<CustomerSummaryRow> for CustomerView {
    fn from(customer: CustomerSummaryRow) -> Self {
        CustomerView {
            total_pending_display: format_currency(customer.total_pending),
            total_paid_display: format_currency(customer.total_paid),
            customer,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomersPage {
    pub customers: Vec<CustomerView>,
    pub total_pages: i64,
    pub current_page: i64,
}

pub async fn load_customers_page(
    state: &AppState,
    search: &SearchQuery,
) -> Result<CustomersPage, AppError> {
    let rows = queries::fetch_filtered_customers(&state.db, search).await?;
    let total = queries::count_filtered_customers(&state.db, search).await?;
    Ok(CustomersPage {
        customers: rows.into_iter().map(CustomerView::from).collect(),
        total_pages: total_pages(total),
        current_page: search.page(),
    })
}

/// GET /api/customers?query=&page=
pub async fn handle_list_customers(
    State(state): State<AppState>,
    QueryParams(search): QueryParams<SearchQuery>,
) -> Result<Json<CustomersPage>, AppError> {
    Ok(Json(load_customers_page(&state, &search).await?))
}

/// GET /api/customers/names
pub async fn handle_customer_names(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerField>>, AppError> {
    Ok(Json(queries::fetch_customer_names(&state.db).await?))
}

/// GET /api/customers/:id
pub async fn handle_get_customer(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<CustomerRow>, AppError> {
    Ok(Json(queries::fetch_customer_by_id(&state.db, id).await?))
}

/// POST /api/customers
pub async fn handle_create_customer(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<CustomerForm>,
) -> Result<(StatusCode, Json<CustomerRow>), AppError> {
    let input = form.validate(CustomerAction::Create)?;
    let row = queries::create_customer(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /api/customers/:id
pub async fn handle_update_customer(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(form): JsonBody<CustomerForm>,
) -> Result<Json<CustomerRow>, AppError> {
    let input = form.validate(CustomerAction::Update)?;
    Ok(Json(queries::update_customer(&state.db, id, &input).await?))
}

/// DELETE /api/customers/:id
pub async fn handle_delete_customer(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, AppError> {
    queries::delete_customer(&state.db, id).await?;
    Ok(Json(json!({ "message": "Deleted Customer." })))
}

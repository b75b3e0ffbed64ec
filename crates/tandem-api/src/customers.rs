//! Customer endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use tandem_core::service::customers as service;
use tandem_core::service::customers::CustomerInput;
use tandem_core::sync::PullSummary;
use tandem_core::Customer;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::routes::{list_filter, parse_since, AppState, ListQuery, PullRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list).post(create))
        .route("/customers/{id}", get(fetch).put(update).delete(remove))
        .route("/customers/pull", post(pull))
}

#[derive(Debug, Deserialize)]
struct CustomerBody {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company_id: Option<i64>,
}

impl From<CustomerBody> for CustomerInput {
    fn from(body: CustomerBody) -> Self {
        Self {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            phone: body.phone,
            company_id: body.company_id,
        }
    }
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let filter = list_filter(query)?;
    let customers = service::find_customers(state.db.connection(), &filter).await?;
    Ok(Json(customers))
}

async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CustomerBody>,
) -> Result<Json<Customer>, AppError> {
    let customer =
        service::create_customer(state.db.connection(), state.shopify.as_ref(), body.into())
            .await?;
    tracing::info!(user_id = user.id, customer_id = customer.id, "Customer created");
    Ok(Json(customer))
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, AppError> {
    let customer = service::get_customer(state.db.connection(), id).await?;
    Ok(Json(customer))
}

async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<CustomerBody>,
) -> Result<Json<Customer>, AppError> {
    let customer =
        service::update_customer(state.db.connection(), state.shopify.as_ref(), id, body.into())
            .await?;
    tracing::info!(user_id = user.id, customer_id = customer.id, "Customer updated");
    Ok(Json(customer))
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Customer>, AppError> {
    let customer =
        service::delete_customer(state.db.connection(), state.shopify.as_ref(), id).await?;
    tracing::info!(user_id = user.id, customer_id = customer.id, "Customer deleted");
    Ok(Json(customer))
}

async fn pull(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<PullRequest>,
) -> Result<Json<PullSummary>, AppError> {
    let since = parse_since(&body.since)?;
    let summary =
        service::pull_customers(state.db.connection(), state.shopify.as_ref(), since).await?;
    tracing::info!(
        user_id = user.id,
        pages = summary.pages,
        updated = summary.updated,
        imported = summary.imported,
        "Customer pull finished"
    );
    Ok(Json(summary))
}

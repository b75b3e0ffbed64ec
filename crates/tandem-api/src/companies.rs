//! Company endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use tandem_core::service::companies as service;
use tandem_core::sync::PullSummary;
use tandem_core::Company;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::routes::{list_filter, parse_since, AppState, ListQuery, PullRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list).post(create))
        .route("/companies/{id}", get(fetch).put(update).delete(remove))
        .route("/companies/pull", post(pull))
}

#[derive(Debug, Deserialize)]
struct CompanyBody {
    name: String,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Company>>, AppError> {
    let filter = list_filter(query)?;
    let companies = service::find_companies(state.db.connection(), &filter).await?;
    Ok(Json(companies))
}

async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CompanyBody>,
) -> Result<Json<Company>, AppError> {
    let company =
        service::create_company(state.db.connection(), state.shopify.as_ref(), &body.name).await?;
    tracing::info!(user_id = user.id, company_id = company.id, "Company created");
    Ok(Json(company))
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Company>, AppError> {
    let company = service::get_company(state.db.connection(), id).await?;
    Ok(Json(company))
}

async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<CompanyBody>,
) -> Result<Json<Company>, AppError> {
    let company =
        service::update_company(state.db.connection(), state.shopify.as_ref(), id, &body.name)
            .await?;
    tracing::info!(user_id = user.id, company_id = company.id, "Company updated");
    Ok(Json(company))
}

async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Company>, AppError> {
    let company =
        service::delete_company(state.db.connection(), state.shopify.as_ref(), id).await?;
    tracing::info!(user_id = user.id, company_id = company.id, "Company deleted");
    Ok(Json(company))
}

async fn pull(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<PullRequest>,
) -> Result<Json<PullSummary>, AppError> {
    let since = parse_since(&body.since)?;
    let summary =
        service::pull_companies(state.db.connection(), state.shopify.as_ref(), since).await?;
    tracing::info!(
        user_id = user.id,
        pages = summary.pages,
        updated = summary.updated,
        imported = summary.imported,
        "Company pull finished"
    );
    Ok(Json(summary))
}

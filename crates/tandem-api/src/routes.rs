use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use http::{header, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tandem_core::db::{Database, ListFilter};
use tandem_core::shopify::{ShopifyClient, ShopifyConfig};

use crate::auth::{self, require_auth};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::{companies, customers};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub shopify: Arc<ShopifyClient>,
}

impl AppState {
    pub async fn initialize(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let db = Database::open(&config.db_path).await?;
        let shopify = ShopifyClient::new(&ShopifyConfig {
            store_domain: config.shopify_store_domain.clone(),
            admin_api_token: config.shopify_admin_api_token.clone(),
            api_version: config.shopify_api_version.clone(),
        })
        .map_err(|error| AppError::Config(error.to_string()))?;

        Ok(Self {
            config,
            db: Arc::new(db),
            shopify: Arc::new(shopify),
        })
    }
}

pub fn app_router(state: AppState) -> Result<Router, AppError> {
    let cors_origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| AppError::Config("TANDEM_CORS_ORIGIN is not a valid header value".to_string()))?;

    let protected_routes = Router::new()
        .merge(companies::router())
        .merge(customers::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    Ok(Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", auth_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        // Credentialed CORS forbids wildcards, so origin/methods/headers
        // are all explicit.
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .with_state(state))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

/// List pagination accepted by the collection endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub skip: Option<u32>,
    pub take: Option<u32>,
}

pub fn list_filter(query: ListQuery) -> Result<ListFilter, AppError> {
    let take = query.take.unwrap_or(50);
    if !(1..=200).contains(&take) {
        return Err(AppError::bad_request("take must be in 1..=200"));
    }
    Ok(ListFilter {
        search: query.search,
        skip: query.skip.unwrap_or(0),
        take,
    })
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub since: String,
}

pub fn parse_since(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| AppError::bad_request(format!("since must be an RFC 3339 timestamp: {raw}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn list_filter_validates_take_range() {
        let filter = list_filter(ListQuery::default()).unwrap();
        assert_eq!(filter.take, 50);
        assert_eq!(filter.skip, 0);

        let filter = list_filter(ListQuery {
            search: Some("acme".to_string()),
            skip: Some(10),
            take: Some(200),
        })
        .unwrap();
        assert_eq!(filter.take, 200);

        for take in [0, 201] {
            let err = list_filter(ListQuery {
                take: Some(take),
                ..ListQuery::default()
            })
            .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[test]
    fn since_parses_rfc3339_and_rejects_garbage() {
        let parsed = parse_since("2024-06-01T12:00:00Z").unwrap();
        assert_eq!(parsed.timestamp(), 1_717_243_200);

        assert!(parse_since("yesterday").is_err());
        assert!(parse_since("2024-06-01").is_err());
    }
}

//! Pull drivers for remote-to-local synchronization
//!
//! Each driver pages through the platform's records changed since a
//! timestamp and reconciles every page into the local store, updates
//! before inserts. Pagination is an explicit cursor loop; it terminates
//! on the remote's has-next-page flag, on an empty page, or on a page
//! that claims more data but carries no cursor.

pub mod reconcile;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::shopify::{CompanyRemote, CustomerRemote};

/// Records fetched per search call.
pub const PULL_PAGE_SIZE: u32 = 50;

/// Build the platform's query-language filter for "changed since".
pub fn updated_since_query(since: DateTime<Utc>) -> String {
    format!(
        "updated_at:>\"{}\"",
        since.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Outcome of one pull run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub pages: u32,
    pub updated: u64,
    pub imported: u64,
}

/// Pull companies changed since `since` and reconcile them locally.
pub async fn pull_companies_since(
    conn: &Connection,
    remote: &impl CompanyRemote,
    since: DateTime<Utc>,
) -> Result<PullSummary> {
    let query = updated_since_query(since);
    let mut summary = PullSummary::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = remote
            .search_companies(&query, PULL_PAGE_SIZE, cursor.as_deref())
            .await?;
        if page.nodes.is_empty() {
            break;
        }

        summary.pages += 1;
        summary.updated += reconcile::reconcile_company_updates(conn, &page.nodes).await?;
        summary.imported += reconcile::reconcile_company_inserts(conn, &page.nodes).await?;

        match page.page_info.end_cursor {
            Some(next) if page.page_info.has_next_page => cursor = Some(next),
            _ => break,
        }
    }

    tracing::info!(
        resource = "companies",
        pages = summary.pages,
        updated = summary.updated,
        imported = summary.imported,
        "Pull finished"
    );
    Ok(summary)
}

/// Pull customers changed since `since` and reconcile them locally.
///
/// Run after the company pull when both resources are requested, so
/// customer company links resolve within the same run.
pub async fn pull_customers_since(
    conn: &Connection,
    remote: &impl CustomerRemote,
    since: DateTime<Utc>,
) -> Result<PullSummary> {
    let query = updated_since_query(since);
    let mut summary = PullSummary::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = remote
            .search_customers(&query, PULL_PAGE_SIZE, cursor.as_deref())
            .await?;
        if page.nodes.is_empty() {
            break;
        }

        summary.pages += 1;
        summary.updated += reconcile::reconcile_customer_updates(conn, &page.nodes).await?;
        summary.imported += reconcile::reconcile_customer_inserts(conn, &page.nodes).await?;

        match page.page_info.end_cursor {
            Some(next) if page.page_info.has_next_page => cursor = Some(next),
            _ => break,
        }
    }

    tracing::info!(
        resource = "customers",
        pages = summary.pages,
        updated = summary.updated,
        imported = summary.imported,
        "Pull finished"
    );
    Ok(summary)
}

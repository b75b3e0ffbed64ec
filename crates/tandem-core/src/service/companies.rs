//! Company operations: local CRUD with a remote mirror

use chrono::{DateTime, Utc};
use libsql::Connection;

use crate::db::{CompanyDraft, CompanyRepository, LibSqlCompanyRepository, ListFilter};
use crate::error::{Error, Result};
use crate::models::Company;
use crate::shopify::{CompanyRemote, RemoteCompanyDraft};
use crate::sync::{self, PullSummary};

/// Create a company locally, mirror it to the platform, and record the
/// assigned platform id.
///
/// The remote create carries the local primary key as the platform-side
/// `externalId`. If the mirror fails the local row stays, without a
/// platform id, and the error propagates.
pub async fn create_company(
    conn: &Connection,
    remote: &impl CompanyRemote,
    name: &str,
) -> Result<Company> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Company name must not be empty".to_string(),
        ));
    }

    let repo = LibSqlCompanyRepository::new(conn);
    let company = repo
        .create(&CompanyDraft {
            name: name.to_string(),
            shopify_id: None,
        })
        .await?;

    let remote_company = remote
        .create_company(&RemoteCompanyDraft {
            name: company.name.clone(),
            external_id: company.id.to_string(),
        })
        .await?;

    let company = repo.set_shopify_id(company.id, &remote_company.id).await?;
    tracing::info!(company_id = company.id, "Created company and mirrored to platform");
    Ok(company)
}

/// Rename a company locally and, when it is linked, remotely.
pub async fn update_company(
    conn: &Connection,
    remote: &impl CompanyRemote,
    id: i64,
    name: &str,
) -> Result<Company> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Company name must not be empty".to_string(),
        ));
    }

    let repo = LibSqlCompanyRepository::new(conn);
    let company = repo.update_name(id, name).await?;

    if let Some(shopify_id) = company.shopify_id.as_deref() {
        remote.update_company(shopify_id, &company.name).await?;
    }
    Ok(company)
}

/// Delete a company locally and, when it was linked, remotely.
///
/// The local foreign key empties the company link of any customers that
/// referenced it.
pub async fn delete_company(
    conn: &Connection,
    remote: &impl CompanyRemote,
    id: i64,
) -> Result<Company> {
    let repo = LibSqlCompanyRepository::new(conn);
    let company = repo.delete(id).await?;

    if let Some(shopify_id) = company.shopify_id.as_deref() {
        remote.delete_company(shopify_id).await?;
    }
    tracing::info!(company_id = company.id, "Deleted company");
    Ok(company)
}

pub async fn get_company(conn: &Connection, id: i64) -> Result<Company> {
    LibSqlCompanyRepository::new(conn).get(id).await
}

pub async fn find_companies(conn: &Connection, filter: &ListFilter) -> Result<Vec<Company>> {
    LibSqlCompanyRepository::new(conn).list(filter).await
}

/// Pull companies changed on the platform since `since`.
pub async fn pull_companies(
    conn: &Connection,
    remote: &impl CompanyRemote,
    since: DateTime<Utc>,
) -> Result<PullSummary> {
    sync::pull_companies_since(conn, remote, since).await
}

//! Reconciliation of pulled remote batches into the local store
//!
//! Two passes per resource kind: an update pass applying last-write-wins
//! overwrites to rows already known by platform id, and an insert pass
//! bulk-importing the unknown ones. Each record is evaluated on its own;
//! a remotely stale record never blocks the rest of its batch.

use std::collections::{HashMap, HashSet};

use libsql::Connection;

use crate::db::{
    CompanyDraft, CompanyRepository, CustomerDraft, CustomerRemoteFields, CustomerRepository,
    LibSqlCompanyRepository, LibSqlCustomerRepository,
};
use crate::error::Result;
use crate::shopify::{RemoteCompany, RemoteCustomer};

/// Apply the update pass for a pulled company batch.
///
/// Rows whose local `updated_at` is strictly newer than the remote
/// timestamp are skipped (ties apply the remote). The surviving updates
/// are applied in one transaction. Returns the number of rows updated.
pub async fn reconcile_company_updates(
    conn: &Connection,
    remote: &[RemoteCompany],
) -> Result<u64> {
    let repo = LibSqlCompanyRepository::new(conn);
    let ids: Vec<String> = remote.iter().map(|company| company.id.clone()).collect();
    let known = repo.find_by_shopify_ids(&ids).await?;
    let local_updated_at: HashMap<&str, i64> = known
        .iter()
        .filter_map(|company| {
            company
                .shopify_id
                .as_deref()
                .map(|sid| (sid, company.updated_at))
        })
        .collect();

    let applicable: Vec<&RemoteCompany> = remote
        .iter()
        .filter(|company| {
            local_updated_at
                .get(company.id.as_str())
                .is_some_and(|&local| local <= company.updated_at.timestamp_millis())
        })
        .collect();

    if applicable.is_empty() {
        return Ok(0);
    }

    conn.execute("BEGIN TRANSACTION", ()).await?;
    for company in &applicable {
        if let Err(e) = repo.update_by_shopify_id(&company.id, &company.name).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
    }
    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(applicable.len() as u64)
}

/// Apply the insert pass for a pulled company batch.
///
/// Records whose platform id already exists locally are left to the
/// update pass. Returns the number of rows imported.
pub async fn reconcile_company_inserts(
    conn: &Connection,
    remote: &[RemoteCompany],
) -> Result<u64> {
    let repo = LibSqlCompanyRepository::new(conn);
    let ids: Vec<String> = remote.iter().map(|company| company.id.clone()).collect();
    let known: HashSet<String> = repo
        .find_by_shopify_ids(&ids)
        .await?
        .into_iter()
        .filter_map(|company| company.shopify_id)
        .collect();

    let drafts: Vec<CompanyDraft> = remote
        .iter()
        .filter(|company| !known.contains(&company.id))
        .map(|company| CompanyDraft {
            name: company.name.clone(),
            shopify_id: Some(company.id.clone()),
        })
        .collect();

    repo.create_many(&drafts).await
}

/// Apply the update pass for a pulled customer batch.
///
/// Only the platform-owned fields are overwritten; the local company
/// link is never touched by the update pass.
pub async fn reconcile_customer_updates(
    conn: &Connection,
    remote: &[RemoteCustomer],
) -> Result<u64> {
    let repo = LibSqlCustomerRepository::new(conn);
    let ids: Vec<String> = remote.iter().map(|customer| customer.id.clone()).collect();
    let known = repo.find_by_shopify_ids(&ids).await?;
    let local_updated_at: HashMap<&str, i64> = known
        .iter()
        .filter_map(|customer| {
            customer
                .shopify_id
                .as_deref()
                .map(|sid| (sid, customer.updated_at))
        })
        .collect();

    let applicable: Vec<&RemoteCustomer> = remote
        .iter()
        .filter(|customer| {
            local_updated_at
                .get(customer.id.as_str())
                .is_some_and(|&local| local <= customer.updated_at.timestamp_millis())
        })
        .collect();

    if applicable.is_empty() {
        return Ok(0);
    }

    conn.execute("BEGIN TRANSACTION", ()).await?;
    for customer in &applicable {
        let fields = CustomerRemoteFields {
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            locale: customer.locale.clone(),
            state: customer.state,
        };
        if let Err(e) = repo.update_by_shopify_id(&customer.id, &fields).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }
    }
    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(applicable.len() as u64)
}

/// Apply the insert pass for a pulled customer batch.
///
/// Each new customer's remote company reference is resolved to a local
/// company by platform id; unresolved references import with an empty
/// association rather than failing the batch.
pub async fn reconcile_customer_inserts(
    conn: &Connection,
    remote: &[RemoteCustomer],
) -> Result<u64> {
    let customers = LibSqlCustomerRepository::new(conn);
    let ids: Vec<String> = remote.iter().map(|customer| customer.id.clone()).collect();
    let known: HashSet<String> = customers
        .find_by_shopify_ids(&ids)
        .await?
        .into_iter()
        .filter_map(|customer| customer.shopify_id)
        .collect();

    let new_customers: Vec<&RemoteCustomer> = remote
        .iter()
        .filter(|customer| !known.contains(&customer.id))
        .collect();

    let company_ids: Vec<String> = new_customers
        .iter()
        .filter_map(|customer| customer.company_id.clone())
        .collect();
    let companies = LibSqlCompanyRepository::new(conn);
    let local_companies: HashMap<String, i64> = companies
        .find_by_shopify_ids(&company_ids)
        .await?
        .into_iter()
        .filter_map(|company| company.shopify_id.map(|sid| (sid, company.id)))
        .collect();

    let drafts: Vec<CustomerDraft> = new_customers
        .iter()
        .map(|customer| CustomerDraft {
            shopify_id: Some(customer.id.clone()),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            locale: customer.locale.clone(),
            state: customer.state,
            company_id: customer
                .company_id
                .as_ref()
                .and_then(|sid| local_companies.get(sid))
                .copied(),
        })
        .collect();

    customers.create_many(&drafts).await
}

//! Company repository

use chrono::Utc;
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::Company;
use crate::util::escape_like;

use super::ListFilter;

/// Input for creating a company row.
///
/// `shopify_id` stays `None` on the push path (the remote id arrives after
/// the mirror call) and is set when importing pulled records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyDraft {
    pub name: String,
    pub shopify_id: Option<String>,
}

/// Company storage operations (async)
#[allow(async_fn_in_trait)]
pub trait CompanyRepository {
    async fn create(&self, draft: &CompanyDraft) -> Result<Company>;

    /// Insert a batch in a single transaction; returns the number inserted.
    async fn create_many(&self, drafts: &[CompanyDraft]) -> Result<u64>;

    /// List with an optional case-insensitive name filter and skip/take paging.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Company>>;

    async fn get(&self, id: i64) -> Result<Company>;

    /// Fetch all rows whose platform id is in the given set.
    async fn find_by_shopify_ids(&self, ids: &[String]) -> Result<Vec<Company>>;

    async fn update_name(&self, id: i64, name: &str) -> Result<Company>;

    /// Overwrite the mutable fields of the row carrying this platform id.
    async fn update_by_shopify_id(&self, shopify_id: &str, name: &str) -> Result<()>;

    /// Record the platform id assigned to a freshly mirrored row.
    async fn set_shopify_id(&self, id: i64, shopify_id: &str) -> Result<Company>;

    /// Delete and return the removed row.
    async fn delete(&self, id: i64) -> Result<Company>;
}

/// libSQL implementation of `CompanyRepository`
pub struct LibSqlCompanyRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCompanyRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_company(row: &libsql::Row) -> Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            shopify_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

const COMPANY_COLUMNS: &str = "id, shopify_id, name, created_at, updated_at";

impl CompanyRepository for LibSqlCompanyRepository<'_> {
    async fn create(&self, draft: &CompanyDraft) -> Result<Company> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "INSERT INTO companies (shopify_id, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     RETURNING {COMPANY_COLUMNS}"
                ),
                libsql::params![draft.shopify_id.clone(), draft.name.clone(), now],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_company(&row),
            None => Err(Error::NotFound("company insert returned no row".into())),
        }
    }

    async fn create_many(&self, drafts: &[CompanyDraft]) -> Result<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().timestamp_millis();
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        for draft in drafts {
            if let Err(e) = self
                .conn
                .execute(
                    "INSERT INTO companies (shopify_id, name, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)",
                    libsql::params![draft.shopify_id.clone(), draft.name.clone(), now],
                )
                .await
            {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
        }
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(drafts.len() as u64)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Company>> {
        let pattern = filter.search.as_deref().map(escape_like);
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies
                     WHERE ?1 IS NULL OR LOWER(name) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'
                     ORDER BY id
                     LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![pattern, i64::from(filter.take), i64::from(filter.skip)],
            )
            .await?;

        let mut companies = Vec::new();
        while let Some(row) = rows.next().await? {
            companies.push(Self::parse_company(&row)?);
        }
        Ok(companies)
    }

    async fn get(&self, id: i64) -> Result<Company> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_company(&row),
            None => Err(Error::NotFound(format!("Company {id}"))),
        }
    }

    async fn find_by_shopify_ids(&self, ids: &[String]) -> Result<Vec<Company>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies WHERE shopify_id IN ({placeholders})"
                ),
                libsql::params_from_iter(ids.iter().cloned()),
            )
            .await?;

        let mut companies = Vec::new();
        while let Some(row) = rows.next().await? {
            companies.push(Self::parse_company(&row)?);
        }
        Ok(companies)
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<Company> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "UPDATE companies
                     SET name = ?1, updated_at = MAX(?2, updated_at + 1)
                     WHERE id = ?3
                     RETURNING {COMPANY_COLUMNS}"
                ),
                libsql::params![name, now, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_company(&row),
            None => Err(Error::NotFound(format!("Company {id}"))),
        }
    }

    async fn update_by_shopify_id(&self, shopify_id: &str, name: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let affected = self
            .conn
            .execute(
                "UPDATE companies
                 SET name = ?1, updated_at = MAX(?2, updated_at + 1)
                 WHERE shopify_id = ?3",
                libsql::params![name, now, shopify_id],
            )
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(format!(
                "Company with platform id {shopify_id}"
            )));
        }
        Ok(())
    }

    async fn set_shopify_id(&self, id: i64, shopify_id: &str) -> Result<Company> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "UPDATE companies
                     SET shopify_id = ?1, updated_at = MAX(?2, updated_at + 1)
                     WHERE id = ?3
                     RETURNING {COMPANY_COLUMNS}"
                ),
                libsql::params![shopify_id, now, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_company(&row),
            None => Err(Error::NotFound(format!("Company {id}"))),
        }
    }

    async fn delete(&self, id: i64) -> Result<Company> {
        let mut rows = self
            .conn
            .query(
                &format!("DELETE FROM companies WHERE id = ?1 RETURNING {COMPANY_COLUMNS}"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_company(&row),
            None => Err(Error::NotFound(format!("Company {id}"))),
        }
    }
}

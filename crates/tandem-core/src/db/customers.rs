//! Customer repository

use chrono::Utc;
use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{Customer, CustomerState};
use crate::util::escape_like;

use super::ListFilter;

/// Input for creating a customer row (push path and import).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDraft {
    pub shopify_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub locale: Option<String>,
    pub state: CustomerState,
    pub company_id: Option<i64>,
}

/// The locally mutable field set, applied by `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<i64>,
}

/// The platform-owned field set, applied by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerRemoteFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub locale: Option<String>,
    pub state: CustomerState,
}

/// Customer storage operations (async)
#[allow(async_fn_in_trait)]
pub trait CustomerRepository {
    async fn create(&self, draft: &CustomerDraft) -> Result<Customer>;

    /// Insert a batch in a single transaction; returns the number inserted.
    async fn create_many(&self, drafts: &[CustomerDraft]) -> Result<u64>;

    /// List with an optional case-insensitive name/email filter and skip/take paging.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<Customer>>;

    async fn get(&self, id: i64) -> Result<Customer>;

    /// Fetch all rows whose platform id is in the given set.
    async fn find_by_shopify_ids(&self, ids: &[String]) -> Result<Vec<Customer>>;

    /// Overwrite the locally mutable fields.
    async fn update(&self, id: i64, patch: &CustomerPatch) -> Result<Customer>;

    /// Overwrite the platform-owned fields of the row carrying this platform id.
    async fn update_by_shopify_id(
        &self,
        shopify_id: &str,
        fields: &CustomerRemoteFields,
    ) -> Result<()>;

    /// Record the platform id assigned to a freshly mirrored row.
    async fn set_shopify_id(&self, id: i64, shopify_id: &str) -> Result<Customer>;

    /// Delete and return the removed row.
    async fn delete(&self, id: i64) -> Result<Customer>;
}

/// libSQL implementation of `CustomerRepository`
pub struct LibSqlCustomerRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCustomerRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_customer(row: &libsql::Row) -> Result<Customer> {
        let state: String = row.get(7)?;
        Ok(Customer {
            id: row.get(0)?,
            shopify_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            locale: row.get(6)?,
            state: state.parse()?,
            company_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

const CUSTOMER_COLUMNS: &str = "id, shopify_id, first_name, last_name, email, phone, locale, \
                                state, company_id, created_at, updated_at";

impl CustomerRepository for LibSqlCustomerRepository<'_> {
    async fn create(&self, draft: &CustomerDraft) -> Result<Customer> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "INSERT INTO customers
                       (shopify_id, first_name, last_name, email, phone, locale, state,
                        company_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                     RETURNING {CUSTOMER_COLUMNS}"
                ),
                libsql::params![
                    draft.shopify_id.clone(),
                    draft.first_name.clone(),
                    draft.last_name.clone(),
                    draft.email.clone(),
                    draft.phone.clone(),
                    draft.locale.clone(),
                    draft.state.as_str(),
                    draft.company_id,
                    now
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_customer(&row),
            None => Err(Error::NotFound("customer insert returned no row".into())),
        }
    }

    async fn create_many(&self, drafts: &[CustomerDraft]) -> Result<u64> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().timestamp_millis();
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        for draft in drafts {
            if let Err(e) = self
                .conn
                .execute(
                    "INSERT INTO customers
                       (shopify_id, first_name, last_name, email, phone, locale, state,
                        company_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    libsql::params![
                        draft.shopify_id.clone(),
                        draft.first_name.clone(),
                        draft.last_name.clone(),
                        draft.email.clone(),
                        draft.phone.clone(),
                        draft.locale.clone(),
                        draft.state.as_str(),
                        draft.company_id,
                        now
                    ],
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

    async fn list(&self, filter: &ListFilter) -> Result<Vec<Customer>> {
        let pattern = filter.search.as_deref().map(escape_like);
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers
                     WHERE ?1 IS NULL
                        OR LOWER(COALESCE(first_name, '')) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'
                        OR LOWER(COALESCE(last_name, ''))  LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'
                        OR LOWER(COALESCE(email, ''))      LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'
                     ORDER BY id
                     LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![pattern, i64::from(filter.take), i64::from(filter.skip)],
            )
            .await?;

        let mut customers = Vec::new();
        while let Some(row) = rows.next().await? {
            customers.push(Self::parse_customer(&row)?);
        }
        Ok(customers)
    }

    async fn get(&self, id: i64) -> Result<Customer> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_customer(&row),
            None => Err(Error::NotFound(format!("Customer {id}"))),
        }
    }

    async fn find_by_shopify_ids(&self, ids: &[String]) -> Result<Vec<Customer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shopify_id IN ({placeholders})"
                ),
                libsql::params_from_iter(ids.iter().cloned()),
            )
            .await?;

        let mut customers = Vec::new();
        while let Some(row) = rows.next().await? {
            customers.push(Self::parse_customer(&row)?);
        }
        Ok(customers)
    }

    async fn update(&self, id: i64, patch: &CustomerPatch) -> Result<Customer> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "UPDATE customers
                     SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                         company_id = ?5, updated_at = MAX(?6, updated_at + 1)
                     WHERE id = ?7
                     RETURNING {CUSTOMER_COLUMNS}"
                ),
                libsql::params![
                    patch.first_name.clone(),
                    patch.last_name.clone(),
                    patch.email.clone(),
                    patch.phone.clone(),
                    patch.company_id,
                    now,
                    id
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_customer(&row),
            None => Err(Error::NotFound(format!("Customer {id}"))),
        }
    }

    async fn update_by_shopify_id(
        &self,
        shopify_id: &str,
        fields: &CustomerRemoteFields,
    ) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let affected = self
            .conn
            .execute(
                "UPDATE customers
                 SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                     locale = ?5, state = ?6, updated_at = MAX(?7, updated_at + 1)
                 WHERE shopify_id = ?8",
                libsql::params![
                    fields.first_name.clone(),
                    fields.last_name.clone(),
                    fields.email.clone(),
                    fields.phone.clone(),
                    fields.locale.clone(),
                    fields.state.as_str(),
                    now,
                    shopify_id
                ],
            )
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(format!(
                "Customer with platform id {shopify_id}"
            )));
        }
        Ok(())
    }

    async fn set_shopify_id(&self, id: i64, shopify_id: &str) -> Result<Customer> {
        let now = Utc::now().timestamp_millis();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "UPDATE customers
                     SET shopify_id = ?1, updated_at = MAX(?2, updated_at + 1)
                     WHERE id = ?3
                     RETURNING {CUSTOMER_COLUMNS}"
                ),
                libsql::params![shopify_id, now, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_customer(&row),
            None => Err(Error::NotFound(format!("Customer {id}"))),
        }
    }

    async fn delete(&self, id: i64) -> Result<Customer> {
        let mut rows = self
            .conn
            .query(
                &format!("DELETE FROM customers WHERE id = ?1 RETURNING {CUSTOMER_COLUMNS}"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_customer(&row),
            None => Err(Error::NotFound(format!("Customer {id}"))),
        }
    }
}

//! Company queries and mutations

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{mutation_payload, RemoteError, RemotePage, RemoteResult, ShopifyClient};

/// A company record as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCompany {
    /// Platform-assigned id (`gid://shopify/Company/...`)
    pub id: String,
    pub name: String,
    /// Caller-supplied external reference; holds the local primary key
    /// for rows created by the push path.
    pub external_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Fields sent when creating a company remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCompanyDraft {
    pub name: String,
    pub external_id: String,
}

/// Remote company operations, implemented by [`ShopifyClient`] and by
/// scripted doubles in tests.
#[allow(async_fn_in_trait)]
pub trait CompanyRemote {
    /// Query-language search with cursor pagination.
    async fn search_companies(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> RemoteResult<RemotePage<RemoteCompany>>;

    async fn create_company(&self, draft: &RemoteCompanyDraft) -> RemoteResult<RemoteCompany>;

    /// Supersede the mutable fields of the addressed company.
    async fn update_company(&self, id: &str, name: &str) -> RemoteResult<RemoteCompany>;

    /// Delete one company; returns the deleted platform id.
    async fn delete_company(&self, id: &str) -> RemoteResult<String>;
}

const SEARCH_COMPANIES_QUERY: &str = r"
query CompaniesQuery($query: String!, $first: Int!, $cursor: String = null) {
  companies(query: $query, first: $first, after: $cursor) {
    nodes {
      id
      name
      externalId
      updatedAt
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}";

const COMPANY_CREATE_MUTATION: &str = r"
mutation CompanyCreate($input: CompanyCreateInput!) {
  companyCreate(input: $input) {
    company {
      id
      name
      externalId
      updatedAt
    }
    userErrors {
      field
      message
    }
  }
}";

const COMPANY_UPDATE_MUTATION: &str = r"
mutation CompanyUpdate($companyId: ID!, $input: CompanyInput!) {
  companyUpdate(companyId: $companyId, input: $input) {
    company {
      id
      name
      externalId
      updatedAt
    }
    userErrors {
      field
      message
    }
  }
}";

const COMPANIES_DELETE_MUTATION: &str = r"
mutation CompaniesDelete($companyIds: [ID!]!) {
  companiesDelete(companyIds: $companyIds) {
    deletedCompanyIds
    userErrors {
      field
      message
    }
  }
}";

/// Decode a `companies` connection. Plain function so page decoding is
/// testable without a network.
pub fn parse_company_page(connection: &Value) -> RemoteResult<RemotePage<RemoteCompany>> {
    Ok(serde_json::from_value(connection.clone())?)
}

/// Decode a single company node.
pub fn parse_company(node: &Value) -> RemoteResult<RemoteCompany> {
    Ok(serde_json::from_value(node.clone())?)
}

impl CompanyRemote for ShopifyClient {
    async fn search_companies(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> RemoteResult<RemotePage<RemoteCompany>> {
        let data = self
            .execute(
                SEARCH_COMPANIES_QUERY,
                json!({ "query": query, "first": first, "cursor": after }),
            )
            .await?;
        let connection = data.get("companies").ok_or_else(|| {
            RemoteError::InvalidPayload("response missing `companies` connection".to_string())
        })?;
        parse_company_page(connection)
    }

    async fn create_company(&self, draft: &RemoteCompanyDraft) -> RemoteResult<RemoteCompany> {
        let data = self
            .execute(
                COMPANY_CREATE_MUTATION,
                json!({
                    "input": {
                        "company": { "name": draft.name, "externalId": draft.external_id }
                    }
                }),
            )
            .await?;
        let payload = mutation_payload(&data, "companyCreate")?;
        let company = payload.get("company").filter(|c| !c.is_null()).ok_or_else(|| {
            RemoteError::InvalidPayload("companyCreate returned no company".to_string())
        })?;
        parse_company(company)
    }

    async fn update_company(&self, id: &str, name: &str) -> RemoteResult<RemoteCompany> {
        let data = self
            .execute(
                COMPANY_UPDATE_MUTATION,
                json!({ "companyId": id, "input": { "name": name } }),
            )
            .await?;
        let payload = mutation_payload(&data, "companyUpdate")?;
        let company = payload.get("company").filter(|c| !c.is_null()).ok_or_else(|| {
            RemoteError::InvalidPayload("companyUpdate returned no company".to_string())
        })?;
        parse_company(company)
    }

    async fn delete_company(&self, id: &str) -> RemoteResult<String> {
        // The platform mutation deletes a list; the adapter only ever
        // passes a singleton.
        let data = self
            .execute(COMPANIES_DELETE_MUTATION, json!({ "companyIds": [id] }))
            .await?;
        let payload = mutation_payload(&data, "companiesDelete")?;
        payload
            .get("deletedCompanyIds")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                RemoteError::InvalidPayload(
                    "companiesDelete returned no deleted ids".to_string(),
                )
            })
    }
}

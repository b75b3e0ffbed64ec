//! Customer queries and mutations

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::CustomerState;

use super::{mutation_payload, PageInfo, RemoteError, RemotePage, RemoteResult, ShopifyClient};

/// A customer record as the platform reports it.
///
/// `company_id` is the platform id of the first company-contact profile's
/// company, if the customer has any; the link objects themselves are only
/// surfaced through [`CustomerRemote::customer_company_contacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCustomer {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub locale: Option<String>,
    pub state: CustomerState,
    pub updated_at: DateTime<Utc>,
    pub company_id: Option<String>,
}

/// Fields sent when creating or updating a customer remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCustomerDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Remote customer operations, implemented by [`ShopifyClient`] and by
/// scripted doubles in tests.
#[allow(async_fn_in_trait)]
pub trait CustomerRemote {
    async fn search_customers(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> RemoteResult<RemotePage<RemoteCustomer>>;

    async fn create_customer(&self, draft: &RemoteCustomerDraft) -> RemoteResult<RemoteCustomer>;

    /// Supersede the mutable fields of the addressed customer.
    async fn update_customer(
        &self,
        id: &str,
        draft: &RemoteCustomerDraft,
    ) -> RemoteResult<RemoteCustomer>;

    /// Delete one customer; returns the deleted platform id.
    async fn delete_customer(&self, id: &str) -> RemoteResult<String>;

    /// Fetch the customer's company-contact link ids, oldest first.
    /// An unknown customer reads as having no links.
    async fn customer_company_contacts(&self, id: &str) -> RemoteResult<Vec<String>>;

    /// Create a contact link between a company and a customer; returns
    /// the new link id.
    async fn assign_company_contact(
        &self,
        company_id: &str,
        customer_id: &str,
    ) -> RemoteResult<String>;

    /// Delete contact links by id; returns the deleted link ids.
    async fn remove_company_contacts(&self, contact_ids: &[String]) -> RemoteResult<Vec<String>>;
}

const CUSTOMER_FIELDS: &str = r"
      id
      firstName
      lastName
      email
      phone
      locale
      state
      updatedAt";

fn search_customers_query() -> String {
    format!(
        r"
query CustomersQuery($query: String!, $first: Int!, $cursor: String = null) {{
  customers(query: $query, first: $first, after: $cursor) {{
    nodes {{{CUSTOMER_FIELDS}
      companyContactProfiles {{
        id
        company {{
          id
        }}
      }}
    }}
    pageInfo {{
      hasNextPage
      endCursor
    }}
  }}
}}"
    )
}

const CUSTOMER_CONTACTS_QUERY: &str = r"
query CustomerQuery($id: ID!) {
  customer(id: $id) {
    id
    companyContactProfiles {
      id
    }
  }
}";

fn customer_create_mutation() -> String {
    format!(
        r"
mutation CustomerCreate($input: CustomerInput!) {{
  customerCreate(input: $input) {{
    customer {{{CUSTOMER_FIELDS}
    }}
    userErrors {{
      field
      message
    }}
  }}
}}"
    )
}

fn customer_update_mutation() -> String {
    format!(
        r"
mutation CustomerUpdate($input: CustomerInput!) {{
  customerUpdate(input: $input) {{
    customer {{{CUSTOMER_FIELDS}
    }}
    userErrors {{
      field
      message
    }}
  }}
}}"
    )
}

const CUSTOMER_DELETE_MUTATION: &str = r"
mutation CustomerDelete($id: ID!) {
  customerDelete(input: { id: $id }) {
    deletedCustomerId
    userErrors {
      field
      message
    }
  }
}";

const ASSIGN_CONTACT_MUTATION: &str = r"
mutation CompanyAssignCustomerAsContact($companyId: ID!, $customerId: ID!) {
  companyAssignCustomerAsContact(companyId: $companyId, customerId: $customerId) {
    companyContact {
      id
    }
    userErrors {
      field
      message
    }
  }
}";

const CONTACTS_DELETE_MUTATION: &str = r"
mutation CompanyContactsDelete($companyContactIds: [ID!]!) {
  companyContactsDelete(companyContactIds: $companyContactIds) {
    deletedCompanyContactIds
    userErrors {
      field
      message
    }
  }
}";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    locale: Option<String>,
    state: CustomerState,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    company_contact_profiles: Vec<ContactProfile>,
}

#[derive(Deserialize)]
struct ContactProfile {
    #[allow(dead_code)]
    id: String,
    company: Option<CompanyRef>,
}

#[derive(Deserialize)]
struct CompanyRef {
    id: String,
}

#[derive(Deserialize)]
struct CustomerConnection {
    nodes: Vec<CustomerNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

impl From<CustomerNode> for RemoteCustomer {
    fn from(node: CustomerNode) -> Self {
        let company_id = node
            .company_contact_profiles
            .first()
            .and_then(|profile| profile.company.as_ref())
            .map(|company| company.id.clone());
        Self {
            id: node.id,
            first_name: node.first_name,
            last_name: node.last_name,
            email: node.email,
            phone: node.phone,
            locale: node.locale,
            state: node.state,
            updated_at: node.updated_at,
            company_id,
        }
    }
}

/// Decode a `customers` connection. Plain function so page decoding is
/// testable without a network.
pub fn parse_customer_page(connection: &Value) -> RemoteResult<RemotePage<RemoteCustomer>> {
    let wire: CustomerConnection = serde_json::from_value(connection.clone())?;
    Ok(RemotePage {
        nodes: wire.nodes.into_iter().map(RemoteCustomer::from).collect(),
        page_info: wire.page_info,
    })
}

/// Decode a single customer node.
pub fn parse_customer(node: &Value) -> RemoteResult<RemoteCustomer> {
    let wire: CustomerNode = serde_json::from_value(node.clone())?;
    Ok(wire.into())
}

fn draft_fields(draft: &RemoteCustomerDraft) -> Value {
    json!({
        "firstName": draft.first_name,
        "lastName": draft.last_name,
        "email": draft.email,
        "phone": draft.phone,
    })
}

impl CustomerRemote for ShopifyClient {
    async fn search_customers(
        &self,
        query: &str,
        first: u32,
        after: Option<&str>,
    ) -> RemoteResult<RemotePage<RemoteCustomer>> {
        let data = self
            .execute(
                &search_customers_query(),
                json!({ "query": query, "first": first, "cursor": after }),
            )
            .await?;
        let connection = data.get("customers").ok_or_else(|| {
            RemoteError::InvalidPayload("response missing `customers` connection".to_string())
        })?;
        parse_customer_page(connection)
    }

    async fn create_customer(&self, draft: &RemoteCustomerDraft) -> RemoteResult<RemoteCustomer> {
        let data = self
            .execute(
                &customer_create_mutation(),
                json!({ "input": draft_fields(draft) }),
            )
            .await?;
        let payload = mutation_payload(&data, "customerCreate")?;
        let customer = payload
            .get("customer")
            .filter(|c| !c.is_null())
            .ok_or_else(|| {
                RemoteError::InvalidPayload("customerCreate returned no customer".to_string())
            })?;
        parse_customer(customer)
    }

    async fn update_customer(
        &self,
        id: &str,
        draft: &RemoteCustomerDraft,
    ) -> RemoteResult<RemoteCustomer> {
        let mut input = draft_fields(draft);
        input["id"] = json!(id);
        let data = self
            .execute(&customer_update_mutation(), json!({ "input": input }))
            .await?;
        let payload = mutation_payload(&data, "customerUpdate")?;
        let customer = payload
            .get("customer")
            .filter(|c| !c.is_null())
            .ok_or_else(|| {
                RemoteError::InvalidPayload("customerUpdate returned no customer".to_string())
            })?;
        parse_customer(customer)
    }

    async fn delete_customer(&self, id: &str) -> RemoteResult<String> {
        let data = self
            .execute(CUSTOMER_DELETE_MUTATION, json!({ "id": id }))
            .await?;
        let payload = mutation_payload(&data, "customerDelete")?;
        payload
            .get("deletedCustomerId")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                RemoteError::InvalidPayload(
                    "customerDelete returned no deleted id".to_string(),
                )
            })
    }

    async fn customer_company_contacts(&self, id: &str) -> RemoteResult<Vec<String>> {
        let data = self
            .execute(CUSTOMER_CONTACTS_QUERY, json!({ "id": id }))
            .await?;
        let Some(customer) = data.get("customer").filter(|c| !c.is_null()) else {
            return Ok(Vec::new());
        };
        let ids = customer
            .get("companyContactProfiles")
            .and_then(Value::as_array)
            .map(|profiles| {
                profiles
                    .iter()
                    .filter_map(|profile| profile.get("id").and_then(Value::as_str))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn assign_company_contact(
        &self,
        company_id: &str,
        customer_id: &str,
    ) -> RemoteResult<String> {
        let data = self
            .execute(
                ASSIGN_CONTACT_MUTATION,
                json!({ "companyId": company_id, "customerId": customer_id }),
            )
            .await?;
        let payload = mutation_payload(&data, "companyAssignCustomerAsContact")?;
        payload
            .get("companyContact")
            .and_then(|contact| contact.get("id"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                RemoteError::InvalidPayload(
                    "companyAssignCustomerAsContact returned no contact".to_string(),
                )
            })
    }

    async fn remove_company_contacts(&self, contact_ids: &[String]) -> RemoteResult<Vec<String>> {
        let data = self
            .execute(
                CONTACTS_DELETE_MUTATION,
                json!({ "companyContactIds": contact_ids }),
            )
            .await?;
        let payload = mutation_payload(&data, "companyContactsDelete")?;
        let deleted = payload
            .get("deletedCompanyContactIds")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_customer_page_with_contact_profiles() {
        let page = parse_customer_page(&json!({
            "nodes": [
                {
                    "id": "gid://shopify/Customer/1",
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "email": "ada@example.com",
                    "phone": null,
                    "locale": "en",
                    "state": "ENABLED",
                    "updatedAt": "2024-06-01T12:00:00Z",
                    "companyContactProfiles": [
                        { "id": "gid://shopify/CompanyContact/9",
                          "company": { "id": "gid://shopify/Company/3" } }
                    ]
                },
                {
                    "id": "gid://shopify/Customer/2",
                    "firstName": null,
                    "lastName": null,
                    "email": null,
                    "phone": "+15550001",
                    "locale": null,
                    "state": "INVITED",
                    "updatedAt": "2024-06-02T12:00:00Z",
                    "companyContactProfiles": []
                }
            ],
            "pageInfo": { "hasNextPage": true, "endCursor": "cursor-1" }
        }))
        .unwrap();

        assert_eq!(page.nodes.len(), 2);
        assert_eq!(
            page.nodes[0].company_id.as_deref(),
            Some("gid://shopify/Company/3")
        );
        assert_eq!(page.nodes[0].state, CustomerState::Enabled);
        assert_eq!(page.nodes[1].company_id, None);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("cursor-1"));
    }

    #[test]
    fn parses_customer_without_profiles_field() {
        // Mutation responses omit companyContactProfiles entirely.
        let customer = parse_customer(&json!({
            "id": "gid://shopify/Customer/7",
            "firstName": "Grace",
            "lastName": "Hopper",
            "email": "grace@navy.mil",
            "phone": null,
            "locale": null,
            "state": "DISABLED",
            "updatedAt": "2024-06-03T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(customer.company_id, None);
        assert_eq!(customer.state, CustomerState::Disabled);
    }

    #[test]
    fn rejects_unknown_state() {
        let err = parse_customer(&json!({
            "id": "gid://shopify/Customer/7",
            "firstName": null,
            "lastName": null,
            "email": null,
            "phone": null,
            "locale": null,
            "state": "ARCHIVED",
            "updatedAt": "2024-06-03T00:00:00Z"
        }))
        .unwrap_err();
        assert!(matches!(err, RemoteError::Json(_)));
    }
}

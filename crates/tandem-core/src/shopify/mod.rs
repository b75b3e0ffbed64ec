//! Shopify admin API adapter
//!
//! Talks to the platform's GraphQL admin endpoint for the two mirrored
//! resource kinds. The transport and page decoding are shared; the
//! per-resource queries and mutations live in [`companies`] and
//! [`customers`]. Everything is exposed behind the `CompanyRemote` /
//! `CustomerRemote` traits so tests can substitute scripted doubles.

mod client;
pub mod companies;
pub mod customers;

pub use client::{ShopifyClient, ShopifyConfig, DEFAULT_API_VERSION};
pub use companies::{CompanyRemote, RemoteCompany, RemoteCompanyDraft};
pub use customers::{CustomerRemote, RemoteCustomer, RemoteCustomerDraft};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Forward pagination state returned with every page fetch.
///
/// The cursor is opaque; it is only ever passed back verbatim as the
/// `after` argument of the next search call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of a remote connection, shared by both resource kinds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemotePage<T> {
    pub nodes: Vec<T>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

/// A user-facing mutation error reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Errors surfaced by the remote adapter.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid Shopify configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Shopify HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Shopify returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Shopify GraphQL error: {0}")]
    GraphQl(String),
    #[error("Shopify rejected the request: {}", format_user_errors(.0))]
    UserErrors(Vec<UserError>),
    #[error("Invalid Shopify response payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid Shopify response payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|error| match error.field.as_deref() {
            Some(field) if !field.is_empty() => {
                format!("{}: {}", field.join("."), error.message)
            }
            _ => error.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extract a mutation payload and fail on a non-empty `userErrors` list.
///
/// The platform reports validation failures inside an HTTP 200 response,
/// so every mutation result goes through this check.
pub fn mutation_payload<'a>(data: &'a Value, key: &str) -> RemoteResult<&'a Value> {
    let payload = data
        .get(key)
        .filter(|payload| !payload.is_null())
        .ok_or_else(|| RemoteError::InvalidPayload(format!("response missing `{key}`")))?;

    if let Some(errors) = payload.get("userErrors") {
        let errors: Vec<UserError> = serde_json::from_value(errors.clone())?;
        if !errors.is_empty() {
            return Err(RemoteError::UserErrors(errors));
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn page_info_decodes_camel_case() {
        let page: RemotePage<Value> = serde_json::from_value(json!({
            "nodes": [],
            "pageInfo": { "hasNextPage": true, "endCursor": "abc" }
        }))
        .unwrap();
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn mutation_payload_passes_through_when_user_errors_empty() {
        let data = json!({
            "companyCreate": { "company": { "id": "gid://shopify/Company/1" }, "userErrors": [] }
        });
        let payload = mutation_payload(&data, "companyCreate").unwrap();
        assert!(payload.get("company").is_some());
    }

    #[test]
    fn mutation_payload_surfaces_user_errors() {
        let data = json!({
            "customerCreate": {
                "customer": null,
                "userErrors": [
                    { "field": ["input", "email"], "message": "Email has already been taken" }
                ]
            }
        });
        let err = mutation_payload(&data, "customerCreate").unwrap_err();
        let RemoteError::UserErrors(errors) = err else {
            panic!("expected UserErrors, got {err:?}");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Email has already been taken");
    }

    #[test]
    fn mutation_payload_rejects_missing_key() {
        let data = json!({ "somethingElse": {} });
        let err = mutation_payload(&data, "companyCreate").unwrap_err();
        assert!(matches!(err, RemoteError::InvalidPayload(_)));
    }

    #[test]
    fn user_errors_render_with_field_paths() {
        let error = RemoteError::UserErrors(vec![
            UserError {
                field: Some(vec!["input".to_string(), "email".to_string()]),
                message: "is invalid".to_string(),
            },
            UserError {
                field: None,
                message: "something broke".to_string(),
            },
        ]);
        let rendered = error.to_string();
        assert!(rendered.contains("input.email: is invalid"));
        assert!(rendered.contains("something broke"));
    }
}

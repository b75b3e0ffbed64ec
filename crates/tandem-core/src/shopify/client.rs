//! GraphQL transport for the Shopify admin API
//!
//! One `execute` method posts `{query, variables}` to the store's admin
//! endpoint; the per-resource modules build documents and decode `data`.

use std::fmt;

use serde_json::Value;

use crate::util::compact_text;

use super::{RemoteError, RemoteResult};

/// Admin API version the adapter targets unless configured otherwise.
pub const DEFAULT_API_VERSION: &str = "2024-07";

/// Credentials and addressing for one store's admin API.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopifyConfig {
    /// Store domain, e.g. `my-store.myshopify.com`. Scheme and trailing
    /// slashes are stripped on client construction.
    pub store_domain: String,
    pub admin_api_token: String,
    pub api_version: String,
}

impl fmt::Debug for ShopifyConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ShopifyConfig")
            .field("store_domain", &self.store_domain)
            .field("admin_api_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Client for the Shopify GraphQL admin endpoint.
#[derive(Clone)]
pub struct ShopifyClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig) -> RemoteResult<Self> {
        let domain = normalize_store_domain(&config.store_domain)?;
        let token = config.admin_api_token.trim();
        if token.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Admin API token must not be empty".to_string(),
            ));
        }
        let version = config.api_version.trim();
        let version = if version.is_empty() {
            DEFAULT_API_VERSION
        } else {
            version
        };

        Ok(Self {
            endpoint: format!("https://{domain}/admin/api/{version}/graphql.json"),
            token: token.to_string(),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// The resolved GraphQL endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute one GraphQL document and return the `data` payload.
    ///
    /// Top-level `errors` fail the call even on HTTP 200; `userErrors`
    /// inside mutation payloads are the caller's concern.
    pub(crate) async fn execute(&self, query: &str, variables: Value) -> RemoteResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.token)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status,
                body: compact_text(&body),
            });
        }

        let mut payload = response.json::<Value>().await?;

        if let Some(errors) = payload.get("errors").filter(|errors| !errors.is_null()) {
            return Err(RemoteError::GraphQl(format_graphql_errors(errors)));
        }

        match payload.get_mut("data") {
            Some(data) if !data.is_null() => Ok(data.take()),
            _ => Err(RemoteError::InvalidPayload(
                "response did not include `data`".to_string(),
            )),
        }
    }
}

fn normalize_store_domain(raw: &str) -> RemoteResult<String> {
    let domain = raw
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string();

    if domain.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "Store domain must not be empty".to_string(),
        ));
    }
    Ok(domain)
}

fn format_graphql_errors(errors: &Value) -> String {
    let messages: Vec<String> = errors
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        compact_text(&errors.to_string())
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn config(domain: &str) -> ShopifyConfig {
        ShopifyConfig {
            store_domain: domain.to_string(),
            admin_api_token: "shpat_secret-token".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    #[test]
    fn client_resolves_endpoint_from_domain() {
        let client = ShopifyClient::new(&config("my-store.myshopify.com")).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://my-store.myshopify.com/admin/api/2024-07/graphql.json"
        );
    }

    #[test]
    fn domain_normalization_strips_scheme_and_slash() {
        assert_eq!(
            normalize_store_domain(" https://my-store.myshopify.com/ ").unwrap(),
            "my-store.myshopify.com"
        );
        assert!(matches!(
            normalize_store_domain("   "),
            Err(RemoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn client_rejects_empty_token() {
        let mut cfg = config("my-store.myshopify.com");
        cfg.admin_api_token = "  ".to_string();
        assert!(matches!(
            ShopifyClient::new(&cfg),
            Err(RemoteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn config_debug_redacts_token() {
        let debug = format!("{:?}", config("my-store.myshopify.com"));
        assert!(!debug.contains("shpat_secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn graphql_errors_join_messages() {
        let rendered = format_graphql_errors(&json!([
            { "message": "Throttled" },
            { "message": "Field 'bogus' doesn't exist" }
        ]));
        assert_eq!(rendered, "Throttled; Field 'bogus' doesn't exist");

        // Non-standard error shapes still produce a bounded message.
        let rendered = format_graphql_errors(&json!({ "weird": true }));
        assert!(rendered.contains("weird"));
    }

    /// Live smoke test against a real store; requires SHOPIFY_STORE_DOMAIN
    /// and SHOPIFY_ADMIN_API_TOKEN in the environment.
    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn live_shop_query() {
        dotenvy::dotenv().ok();
        let cfg = ShopifyConfig {
            store_domain: std::env::var("SHOPIFY_STORE_DOMAIN").unwrap(),
            admin_api_token: std::env::var("SHOPIFY_ADMIN_API_TOKEN").unwrap(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        let client = ShopifyClient::new(&cfg).unwrap();
        let data = client
            .execute("{ shop { name } }", json!({}))
            .await
            .unwrap();
        assert!(data.get("shop").is_some());
    }
}

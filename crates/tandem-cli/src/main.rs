//! Tandem CLI - operator tooling for the admin backend
//!
//! Runs pulls against the commerce platform and inspects the local store
//! without going through the HTTP API.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tandem_core::db::{Database, ListFilter};
use tandem_core::shopify::{ShopifyClient, ShopifyConfig};
use tandem_core::sync::PullSummary;
use tandem_core::{Company, Customer};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Operate the Tandem admin backend from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull records changed on the platform since a timestamp
    Pull {
        /// RFC 3339 lower bound, e.g. 2024-06-01T00:00:00Z
        #[arg(long)]
        since: String,
        /// Which resource to pull
        #[arg(long, value_enum, default_value_t = PullResource::All)]
        resource: PullResource,
    },
    /// List companies from the local store
    Companies {
        /// Filter by name substring
        #[arg(long)]
        search: Option<String>,
        /// Rows to skip
        #[arg(long, default_value = "0")]
        skip: u32,
        /// Rows to return
        #[arg(long, default_value = "50")]
        take: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List customers from the local store
    Customers {
        /// Filter by name/email substring
        #[arg(long)]
        search: Option<String>,
        /// Rows to skip
        #[arg(long, default_value = "0")]
        skip: u32,
        /// Rows to return
        #[arg(long, default_value = "50")]
        take: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum PullResource {
    Companies,
    Customers,
    All,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] tandem_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid --since value (expected RFC 3339): {0}")]
    InvalidSince(String),
    #[error(
        "Shopify credentials are not configured. Set SHOPIFY_STORE_DOMAIN and SHOPIFY_ADMIN_API_TOKEN to enable `tandem pull`."
    )]
    ShopifyNotConfigured,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Pull { since, resource } => run_pull(&since, resource, &db_path).await,
        Commands::Companies {
            search,
            skip,
            take,
            json,
        } => run_companies(search, skip, take, json, &db_path).await,
        Commands::Customers {
            search,
            skip,
            take,
            json,
        } => run_customers(search, skip, take, json, &db_path).await,
    }
}

fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var("TANDEM_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./tandem.db"))
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidSince(raw.to_string()))
}

fn shopify_from_env() -> Result<ShopifyClient, CliError> {
    let store_domain = env::var("SHOPIFY_STORE_DOMAIN").unwrap_or_default();
    let admin_api_token = env::var("SHOPIFY_ADMIN_API_TOKEN").unwrap_or_default();
    let api_version = env::var("SHOPIFY_API_VERSION")
        .unwrap_or_else(|_| tandem_core::shopify::DEFAULT_API_VERSION.to_string());

    ShopifyClient::new(&ShopifyConfig {
        store_domain,
        admin_api_token,
        api_version,
    })
    .map_err(|_| CliError::ShopifyNotConfigured)
}

async fn run_pull(since: &str, resource: PullResource, db_path: &Path) -> Result<(), CliError> {
    let since = parse_since(since)?;
    let shopify = shopify_from_env()?;
    let db = Database::open(db_path).await?;
    let conn = db.connection();

    // Companies first so customer company links resolve in the same run.
    if matches!(resource, PullResource::Companies | PullResource::All) {
        let summary = tandem_core::service::companies::pull_companies(conn, &shopify, since).await?;
        print_summary("companies", summary);
    }
    if matches!(resource, PullResource::Customers | PullResource::All) {
        let summary = tandem_core::service::customers::pull_customers(conn, &shopify, since).await?;
        print_summary("customers", summary);
    }
    Ok(())
}

fn print_summary(resource: &str, summary: PullSummary) {
    println!(
        "{resource}: {} page(s), {} updated, {} imported",
        summary.pages, summary.updated, summary.imported
    );
}

async fn run_companies(
    search: Option<String>,
    skip: u32,
    take: u32,
    json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let filter = ListFilter { search, skip, take };
    let companies =
        tandem_core::service::companies::find_companies(db.connection(), &filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&companies)?);
        return Ok(());
    }
    if companies.is_empty() {
        println!("No companies found");
        return Ok(());
    }
    for company in companies {
        println!("{}", format_company(&company));
    }
    Ok(())
}

async fn run_customers(
    search: Option<String>,
    skip: u32,
    take: u32,
    json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = Database::open(db_path).await?;
    let filter = ListFilter { search, skip, take };
    let customers =
        tandem_core::service::customers::find_customers(db.connection(), &filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&customers)?);
        return Ok(());
    }
    if customers.is_empty() {
        println!("No customers found");
        return Ok(());
    }
    for customer in customers {
        println!("{}", format_customer(&customer));
    }
    Ok(())
}

fn format_company(company: &Company) -> String {
    let link = company
        .shopify_id
        .as_deref()
        .unwrap_or("unlinked");
    format!("{:>6}  {}  [{link}]", company.id, company.name)
}

fn format_customer(customer: &Customer) -> String {
    let name = [customer.first_name.as_deref(), customer.last_name.as_deref()]
        .iter()
        .filter_map(|part| *part)
        .collect::<Vec<_>>()
        .join(" ");
    let name = if name.is_empty() { "(unnamed)" } else { &name };
    let email = customer.email.as_deref().unwrap_or("-");
    let link = customer.shopify_id.as_deref().unwrap_or("unlinked");
    format!("{:>6}  {name}  <{email}>  [{link}]", customer.id)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn since_requires_rfc3339() {
        assert!(parse_since("2024-06-01T00:00:00Z").is_ok());
        assert!(parse_since("2024-06-01T00:00:00+02:00").is_ok());
        assert!(parse_since("last tuesday").is_err());
    }

    #[test]
    fn db_path_flag_wins_over_fallback() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db")));
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn company_and_customer_rows_render_links() {
        let company = Company {
            id: 7,
            shopify_id: None,
            name: "Acme".to_string(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(format_company(&company).contains("[unlinked]"));

        let customer = Customer {
            id: 9,
            shopify_id: Some("gid://shopify/Customer/9".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: None,
            email: None,
            phone: None,
            locale: None,
            state: tandem_core::CustomerState::Enabled,
            company_id: None,
            created_at: 0,
            updated_at: 0,
        };
        let line = format_customer(&customer);
        assert!(line.contains("Ada"));
        assert!(line.contains("gid://shopify/Customer/9"));
    }
}

//! Customer operations: local CRUD with a remote mirror and
//! company-contact link upkeep

use chrono::{DateTime, Utc};
use libsql::Connection;

use crate::db::{
    CompanyRepository, CustomerDraft, CustomerPatch, CustomerRepository,
    LibSqlCompanyRepository, LibSqlCustomerRepository, ListFilter,
};
use crate::error::Result;
use crate::models::Customer;
use crate::shopify::{CustomerRemote, RemoteCustomerDraft};
use crate::sync::{self, PullSummary};
use crate::util::normalize_text_option;

/// User-mutable customer fields accepted by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<i64>,
}

impl CustomerInput {
    fn normalized(self) -> Self {
        Self {
            first_name: normalize_text_option(self.first_name),
            last_name: normalize_text_option(self.last_name),
            email: normalize_text_option(self.email),
            phone: normalize_text_option(self.phone),
            company_id: self.company_id,
        }
    }

    fn remote_draft(&self) -> RemoteCustomerDraft {
        RemoteCustomerDraft {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Create a customer locally, mirror it to the platform, link it to its
/// company as a contact when both sides are linked, and record the
/// assigned platform id.
pub async fn create_customer(
    conn: &Connection,
    remote: &impl CustomerRemote,
    input: CustomerInput,
) -> Result<Customer> {
    let input = input.normalized();
    let repo = LibSqlCustomerRepository::new(conn);
    let customer = repo
        .create(&CustomerDraft {
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            company_id: input.company_id,
            ..CustomerDraft::default()
        })
        .await?;

    let remote_customer = remote.create_customer(&input.remote_draft()).await?;

    if let Some(company_id) = customer.company_id {
        let company = LibSqlCompanyRepository::new(conn).get(company_id).await?;
        if let Some(company_sid) = company.shopify_id.as_deref() {
            remote
                .assign_company_contact(company_sid, &remote_customer.id)
                .await?;
        }
    }

    let customer = repo.set_shopify_id(customer.id, &remote_customer.id).await?;
    tracing::info!(customer_id = customer.id, "Created customer and mirrored to platform");
    Ok(customer)
}

/// Update a customer locally and, when it is linked, remotely.
///
/// When the company association changes to a different company and both
/// sides carry platform ids, the customer's first existing contact link
/// is removed before the new one is created. Clearing the association
/// performs no remote link surgery.
pub async fn update_customer(
    conn: &Connection,
    remote: &impl CustomerRemote,
    id: i64,
    input: CustomerInput,
) -> Result<Customer> {
    let input = input.normalized();
    let repo = LibSqlCustomerRepository::new(conn);
    let previous = repo.get(id).await?;
    let customer = repo
        .update(
            id,
            &CustomerPatch {
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                email: input.email.clone(),
                phone: input.phone.clone(),
                company_id: input.company_id,
            },
        )
        .await?;

    let Some(shopify_id) = customer.shopify_id.as_deref() else {
        return Ok(customer);
    };

    remote.update_customer(shopify_id, &input.remote_draft()).await?;

    let company_changed = customer.company_id.is_some() && customer.company_id != previous.company_id;
    if company_changed {
        let company_id = customer.company_id.unwrap_or_default();
        let company = LibSqlCompanyRepository::new(conn).get(company_id).await?;
        if let Some(company_sid) = company.shopify_id.as_deref() {
            let links = remote.customer_company_contacts(shopify_id).await?;
            if let Some(first) = links.first() {
                remote
                    .remove_company_contacts(std::slice::from_ref(first))
                    .await?;
            }
            remote.assign_company_contact(company_sid, shopify_id).await?;
        }
    }

    Ok(customer)
}

/// Delete a customer locally and, when it was linked, remotely.
pub async fn delete_customer(
    conn: &Connection,
    remote: &impl CustomerRemote,
    id: i64,
) -> Result<Customer> {
    let repo = LibSqlCustomerRepository::new(conn);
    let customer = repo.delete(id).await?;

    if let Some(shopify_id) = customer.shopify_id.as_deref() {
        remote.delete_customer(shopify_id).await?;
    }
    tracing::info!(customer_id = customer.id, "Deleted customer");
    Ok(customer)
}

pub async fn get_customer(conn: &Connection, id: i64) -> Result<Customer> {
    LibSqlCustomerRepository::new(conn).get(id).await
}

pub async fn find_customers(conn: &Connection, filter: &ListFilter) -> Result<Vec<Customer>> {
    LibSqlCustomerRepository::new(conn).list(filter).await
}

/// Pull customers changed on the platform since `since`.
pub async fn pull_customers(
    conn: &Connection,
    remote: &impl CustomerRemote,
    since: DateTime<Utc>,
) -> Result<PullSummary> {
    sync::pull_customers_since(conn, remote, since).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use crate::db::{CompanyDraft, Database};
    use crate::error::Error;
    use crate::shopify::{
        PageInfo, RemoteCustomer, RemoteError, RemotePage, RemoteResult,
    };

    use super::*;

    /// Remote double recording every customer mutation and contact-link
    /// operation; `contacts` scripts the link ids a get-by-id reports.
    #[derive(Default)]
    struct FakeCustomerRemote {
        fail_mutations: bool,
        contacts: Mutex<HashMap<String, Vec<String>>>,
        created: Mutex<Vec<RemoteCustomerDraft>>,
        updated: Mutex<Vec<(String, RemoteCustomerDraft)>>,
        deleted: Mutex<Vec<String>>,
        assigned: Mutex<Vec<(String, String)>>,
        removed: Mutex<Vec<String>>,
    }

    impl FakeCustomerRemote {
        fn failing() -> Self {
            Self {
                fail_mutations: true,
                ..Self::default()
            }
        }

        fn with_contacts(customer_id: &str, links: &[&str]) -> Self {
            let remote = Self::default();
            remote.contacts.lock().unwrap().insert(
                customer_id.to_string(),
                links.iter().map(ToString::to_string).collect(),
            );
            remote
        }

        fn rejection() -> RemoteError {
            RemoteError::GraphQl("scripted failure".to_string())
        }
    }

    impl CustomerRemote for FakeCustomerRemote {
        async fn search_customers(
            &self,
            _query: &str,
            _first: u32,
            _after: Option<&str>,
        ) -> RemoteResult<RemotePage<RemoteCustomer>> {
            Ok(RemotePage {
                nodes: Vec::new(),
                page_info: PageInfo::default(),
            })
        }

        async fn create_customer(
            &self,
            draft: &RemoteCustomerDraft,
        ) -> RemoteResult<RemoteCustomer> {
            if self.fail_mutations {
                return Err(Self::rejection());
            }
            let mut created = self.created.lock().unwrap();
            created.push(draft.clone());
            Ok(RemoteCustomer {
                id: format!("gid://shopify/Customer/{}", created.len()),
                first_name: draft.first_name.clone(),
                last_name: draft.last_name.clone(),
                email: draft.email.clone(),
                phone: draft.phone.clone(),
                locale: None,
                state: crate::models::CustomerState::Disabled,
                updated_at: chrono::Utc::now(),
                company_id: None,
            })
        }

        async fn update_customer(
            &self,
            id: &str,
            draft: &RemoteCustomerDraft,
        ) -> RemoteResult<RemoteCustomer> {
            if self.fail_mutations {
                return Err(Self::rejection());
            }
            self.updated
                .lock()
                .unwrap()
                .push((id.to_string(), draft.clone()));
            Ok(RemoteCustomer {
                id: id.to_string(),
                first_name: draft.first_name.clone(),
                last_name: draft.last_name.clone(),
                email: draft.email.clone(),
                phone: draft.phone.clone(),
                locale: None,
                state: crate::models::CustomerState::Disabled,
                updated_at: chrono::Utc::now(),
                company_id: None,
            })
        }

        async fn delete_customer(&self, id: &str) -> RemoteResult<String> {
            if self.fail_mutations {
                return Err(Self::rejection());
            }
            self.deleted.lock().unwrap().push(id.to_string());
            Ok(id.to_string())
        }

        async fn customer_company_contacts(&self, id: &str) -> RemoteResult<Vec<String>> {
            Ok(self
                .contacts
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_default())
        }

        async fn assign_company_contact(
            &self,
            company_id: &str,
            customer_id: &str,
        ) -> RemoteResult<String> {
            if self.fail_mutations {
                return Err(Self::rejection());
            }
            self.assigned
                .lock()
                .unwrap()
                .push((company_id.to_string(), customer_id.to_string()));
            Ok("gid://shopify/CompanyContact/new".to_string())
        }

        async fn remove_company_contacts(
            &self,
            contact_ids: &[String],
        ) -> RemoteResult<Vec<String>> {
            if self.fail_mutations {
                return Err(Self::rejection());
            }
            self.removed.lock().unwrap().extend(contact_ids.iter().cloned());
            Ok(contact_ids.to_vec())
        }
    }

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    /// Insert a company row that is already linked to the platform.
    async fn linked_company(db: &Database, shopify_id: &str) -> i64 {
        let repo = LibSqlCompanyRepository::new(db.connection());
        repo.create(&CompanyDraft {
            name: "Acme".to_string(),
            shopify_id: Some(shopify_id.to_string()),
        })
        .await
        .unwrap()
        .id
    }

    fn input(first: &str) -> CustomerInput {
        CustomerInput {
            first_name: Some(first.to_string()),
            email: Some(format!("{}@example.com", first.to_lowercase())),
            ..CustomerInput::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_assigns_platform_id_and_contact_link() {
        let db = setup().await;
        let remote = FakeCustomerRemote::default();
        let company_id = linked_company(&db, "gid://shopify/Company/C1").await;

        let customer = create_customer(
            db.connection(),
            &remote,
            CustomerInput {
                company_id: Some(company_id),
                ..input("Ada")
            },
        )
        .await
        .unwrap();

        assert_eq!(
            customer.shopify_id.as_deref(),
            Some("gid://shopify/Customer/1")
        );
        assert_eq!(
            *remote.assigned.lock().unwrap(),
            vec![(
                "gid://shopify/Company/C1".to_string(),
                "gid://shopify/Customer/1".to_string()
            )]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_without_company_skips_contact_link() {
        let db = setup().await;
        let remote = FakeCustomerRemote::default();

        create_customer(db.connection(), &remote, input("Ada"))
            .await
            .unwrap();
        assert!(remote.assigned.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_keeps_local_row_when_remote_fails() {
        let db = setup().await;
        let err = create_customer(db.connection(), &FakeCustomerRemote::failing(), input("Ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));

        let rows = find_customers(db.connection(), &ListFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].shopify_id, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_company_change_replaces_contact_link() {
        let db = setup().await;
        let old_company = linked_company(&db, "gid://shopify/Company/OLD").await;

        let remote = FakeCustomerRemote::with_contacts(
            "gid://shopify/Customer/1",
            &["gid://shopify/CompanyContact/old-link"],
        );
        let customer = create_customer(
            db.connection(),
            &remote,
            CustomerInput {
                company_id: Some(old_company),
                ..input("Ada")
            },
        )
        .await
        .unwrap();

        let new_company = {
            let repo = LibSqlCompanyRepository::new(db.connection());
            repo.create(&CompanyDraft {
                name: "Beta".to_string(),
                shopify_id: Some("gid://shopify/Company/NEW".to_string()),
            })
            .await
            .unwrap()
            .id
        };

        update_customer(
            db.connection(),
            &remote,
            customer.id,
            CustomerInput {
                company_id: Some(new_company),
                ..input("Ada")
            },
        )
        .await
        .unwrap();

        // The first existing link is removed, then the new assignment made.
        assert_eq!(
            *remote.removed.lock().unwrap(),
            vec!["gid://shopify/CompanyContact/old-link".to_string()]
        );
        let assigned = remote.assigned.lock().unwrap();
        assert_eq!(
            assigned.last(),
            Some(&(
                "gid://shopify/Company/NEW".to_string(),
                "gid://shopify/Customer/1".to_string()
            ))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unchanged_company_leaves_links_alone() {
        let db = setup().await;
        let company_id = linked_company(&db, "gid://shopify/Company/C1").await;
        let remote = FakeCustomerRemote::default();

        let customer = create_customer(
            db.connection(),
            &remote,
            CustomerInput {
                company_id: Some(company_id),
                ..input("Ada")
            },
        )
        .await
        .unwrap();
        let assigned_after_create = remote.assigned.lock().unwrap().len();

        update_customer(
            db.connection(),
            &remote,
            customer.id,
            CustomerInput {
                first_name: Some("Adeline".to_string()),
                company_id: Some(company_id),
                ..CustomerInput::default()
            },
        )
        .await
        .unwrap();

        assert!(remote.removed.lock().unwrap().is_empty());
        assert_eq!(remote.assigned.lock().unwrap().len(), assigned_after_create);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dissociation_performs_no_link_surgery() {
        let db = setup().await;
        let company_id = linked_company(&db, "gid://shopify/Company/C1").await;
        let remote = FakeCustomerRemote::default();

        let customer = create_customer(
            db.connection(),
            &remote,
            CustomerInput {
                company_id: Some(company_id),
                ..input("Ada")
            },
        )
        .await
        .unwrap();

        let updated = update_customer(
            db.connection(),
            &remote,
            customer.id,
            CustomerInput {
                company_id: None,
                ..input("Ada")
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.company_id, None);
        assert!(remote.removed.lock().unwrap().is_empty());
        assert_eq!(remote.assigned.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_failure_keeps_local_write() {
        let db = setup().await;
        let customer = create_customer(
            db.connection(),
            &FakeCustomerRemote::default(),
            input("Ada"),
        )
        .await
        .unwrap();

        let err = update_customer(
            db.connection(),
            &FakeCustomerRemote::failing(),
            customer.id,
            input("Adeline"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));

        let row = get_customer(db.connection(), customer.id).await.unwrap();
        assert_eq!(row.first_name.as_deref(), Some("Adeline"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_mirrors_remotely() {
        let db = setup().await;
        let remote = FakeCustomerRemote::default();

        let customer = create_customer(db.connection(), &remote, input("Gone"))
            .await
            .unwrap();
        delete_customer(db.connection(), &remote, customer.id)
            .await
            .unwrap();

        assert_eq!(
            *remote.deleted.lock().unwrap(),
            vec!["gid://shopify/Customer/1".to_string()]
        );
    }
}

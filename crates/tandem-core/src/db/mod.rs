//! Local store for Tandem

pub mod companies;
mod connection;
pub mod customers;
mod migrations;
mod sessions;
mod users;

pub use companies::{CompanyDraft, CompanyRepository, LibSqlCompanyRepository};
pub use connection::Database;
pub use customers::{
    CustomerDraft, CustomerPatch, CustomerRemoteFields, CustomerRepository,
    LibSqlCustomerRepository,
};
pub use sessions::{LibSqlSessionRepository, SessionRepository};
pub use users::{LibSqlUserRepository, UserRepository};

/// Search and paging options shared by the list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring match; `None` lists everything.
    pub search: Option<String>,
    pub skip: u32,
    pub take: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            search: None,
            skip: 0,
            take: 50,
        }
    }
}

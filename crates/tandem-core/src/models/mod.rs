//! Data models for Tandem

mod company;
mod customer;
mod session;
mod user;

pub use company::Company;
pub use customer::{Customer, CustomerState};
pub use session::Session;
pub use user::User;

//! tandem-core - Core library for Tandem
//!
//! This crate contains the shared models, local store, Shopify remote
//! adapter, reconciliation engine, and push-path services used by the
//! Tandem interfaces (API server, CLI).

pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod shopify;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Company, Customer, CustomerState};

//! Push-path services
//!
//! Plain async functions over a store connection and a remote adapter.
//! Every local mutation commits first; the remote mirror is best-effort
//! and its failure propagates without rolling the local write back.

pub mod companies;
pub mod customers;

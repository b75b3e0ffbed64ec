//! Operator account model

use std::fmt;

/// An operator account for the admin backend.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// bcrypt hash; never serialized or logged
    pub hashed_password: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl fmt::Debug for User {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

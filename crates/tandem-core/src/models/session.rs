//! Server-side session record

/// A login session backing the API's session cookie.
///
/// The id is the opaque value stored in the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Hard expiry (Unix ms); expired rows are swept on touch
    pub expires_at: i64,
}

impl Session {
    #[must_use]
    pub const fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

//! Company model

use serde::{Deserialize, Serialize};

/// A business account managed locally and mirrored to the commerce platform.
///
/// `shopify_id` is the platform-side id; it is `None` until the record has
/// been mirrored (or when the remote create failed and was never retried).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Locally generated primary key
    pub id: i64,
    /// Platform-side id, unique when present
    pub shopify_id: Option<String>,
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local modification (Unix ms), maintained by the store
    pub updated_at: i64,
}

//! Customer model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lifecycle state of a customer account on the platform.
///
/// The platform owns this value; locally it is only ever written by the
/// reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerState {
    Declined,
    #[default]
    Disabled,
    Enabled,
    Invited,
}

impl CustomerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Declined => "DECLINED",
            Self::Disabled => "DISABLED",
            Self::Enabled => "ENABLED",
            Self::Invited => "INVITED",
        }
    }
}

impl fmt::Display for CustomerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DECLINED" => Ok(Self::Declined),
            "DISABLED" => Ok(Self::Disabled),
            "ENABLED" => Ok(Self::Enabled),
            "INVITED" => Ok(Self::Invited),
            other => Err(Error::InvalidInput(format!(
                "Unknown customer state: {other}"
            ))),
        }
    }
}

/// A customer record, optionally linked to a [`Company`](super::Company).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Locally generated primary key
    pub id: i64,
    /// Platform-side id, unique when present
    pub shopify_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Read-only from the platform
    pub locale: Option<String>,
    pub state: CustomerState,
    /// Owning company, if any; cleared when the company is deleted
    pub company_id: Option<i64>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local modification (Unix ms), maintained by the store
    pub updated_at: i64,
}

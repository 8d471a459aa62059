//! User Status Value Object
//!
//! Lifecycle:
//! - registration creates `PendingVerification`
//! - email verification moves it to `Active`
//! - `Inactive` and `Suspended` are set administratively
//!
//! Only `Active` identities are enabled.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    PendingVerification,
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    /// Stored and serialized code
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "PENDING_VERIFICATION" => Some(Self::PendingVerification),
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "SUSPENDED" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Login and bearer authentication are allowed
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

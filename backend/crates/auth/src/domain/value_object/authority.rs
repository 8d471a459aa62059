//! Authority
//!
//! Flat grant string derived from the role graph:
//! `ROLE_<ROLE NAME UPPERCASED>` for roles, `PERMISSION_<name>` for permissions.

use serde::Serialize;
use std::fmt;

pub const ROLE_PREFIX: &str = "ROLE_";
pub const PERMISSION_PREFIX: &str = "PERMISSION_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    pub fn role(role_name: &str) -> Self {
        Self(format!("{ROLE_PREFIX}{}", role_name.to_uppercase()))
    }

    /// Permission names keep their case.
    pub fn permission(permission_name: &str) -> Self {
        Self(format!("{PERMISSION_PREFIX}{permission_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_role(&self) -> bool {
        self.0.starts_with(ROLE_PREFIX)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Authority {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Authority {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

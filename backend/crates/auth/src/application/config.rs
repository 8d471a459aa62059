//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use crate::domain::value_object::token_kind::TokenKind;

/// Lifetime of each token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: Duration,
    pub refresh: Duration,
    pub verification: Duration,
    pub password_reset: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(15 * 60),            // 15 minutes
            refresh: Duration::from_secs(7 * 24 * 3600),     // 7 days
            verification: Duration::from_secs(24 * 3600),    // 24 hours
            password_reset: Duration::from_secs(3600),       // 1 hour
        }
    }
}

impl TokenTtls {
    pub fn for_kind(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access,
            TokenKind::Refresh => self.refresh,
            TokenKind::Verification => self.verification,
            TokenKind::PasswordReset => self.password_reset,
        }
    }

    pub fn access_ms(&self) -> i64 {
        duration_ms(self.access)
    }
}

/// Saturating conversion to epoch-style milliseconds
pub(crate) fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_ttls: TokenTtls,
    /// Role assigned at registration
    pub default_role: String,
    /// `/api/projects/<segment>` values that name routes, not projects
    pub reserved_project_segments: Vec<String>,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttls: TokenTtls::default(),
            default_role: "USER".to_string(),
            reserved_project_segments: vec!["search".to_string(), "count".to_string()],
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    pub fn is_reserved_segment(&self, segment: &str) -> bool {
        self.reserved_project_segments.iter().any(|s| s == segment)
    }
}

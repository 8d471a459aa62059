//! API DTOs (Data Transfer Objects)
//!
//! Timestamps on the wire are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};

use crate::application::coordinator::{TokenPair, UserView};
use crate::application::principal::Principal;

// ============================================================================
// Register / Login
// ============================================================================

/// Register request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub status: String,
    pub email_verified: bool,
    pub roles: Vec<String>,
    pub last_login_at: Option<i64>,
}

impl From<UserView> for UserResponse {
    fn from(view: UserView) -> Self {
        Self {
            user_id: view.user_id.to_string(),
            email: view.email.into_db(),
            status: view.status.code().to_string(),
            email_verified: view.email_verified,
            roles: view.roles,
            last_login_at: view.last_login_at.map(|t| t.timestamp_millis()),
        }
    }
}

/// Login / refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in milliseconds
    pub expires_in: i64,
    pub user: UserResponse,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type.to_string(),
            expires_in: pair.expires_in_ms,
            user: pair.user.into(),
        }
    }
}

// ============================================================================
// Token Exchange
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Acknowledgement without payload
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Current Principal / Project Access
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub authorities: Vec<String>,
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id().to_string(),
            email: principal.email().as_str().to_string(),
            authorities: principal
                .authorities()
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAccessResponse {
    pub project_id: String,
    pub has_access: bool,
    pub is_owner: bool,
}

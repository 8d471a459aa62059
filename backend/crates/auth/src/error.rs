//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordPolicyError;
use thiserror::Error;

use crate::domain::value_object::email::EmailError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email is already in use")]
    EmailAlreadyInUse,

    #[error("User not found")]
    UserNotFound,

    #[error("Email is already verified")]
    AlreadyVerified,

    /// Covers every token rejection; the precise reason is only logged
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Reset token has expired")]
    ResetTokenExpired,

    /// Never says whether the email or the password was wrong
    #[error("Invalid email or password")]
    CredentialInvalid,

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid project ID format")]
    TenantIdMalformed,

    #[error("Access denied to project")]
    AccessDenied,

    #[error("Project scope required")]
    ProjectScopeRequired,

    #[error("Project owner required")]
    OwnerRequired,

    #[error("{0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    PasswordPolicy(#[from] PasswordPolicyError),

    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::EmailAlreadyInUse | AuthError::AlreadyVerified => ErrorKind::Conflict,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::InvalidOrExpiredToken
            | AuthError::CredentialInvalid
            | AuthError::Unauthenticated => ErrorKind::Unauthorized,
            AuthError::ResetTokenExpired => ErrorKind::Gone,
            AuthError::AccountNotActive
            | AuthError::AccessDenied
            | AuthError::ProjectScopeRequired
            | AuthError::OwnerRequired => ErrorKind::Forbidden,
            AuthError::TenantIdMalformed
            | AuthError::InvalidEmail(_)
            | AuthError::PasswordPolicy(_) => ErrorKind::BadRequest,
            AuthError::MailDelivery(_) => ErrorKind::ServiceUnavailable,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Server-side details (SQL, collaborator messages) stay out of the body.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            AuthError::MailDelivery(_) => AppError::service_unavailable("Mail delivery failed"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::MailDelivery(msg) => {
                tracing::error!(message = %msg, "Mail delivery failed");
            }
            AuthError::CredentialInvalid => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidOrExpiredToken | AuthError::Unauthenticated => {
                tracing::warn!(error = %self, "Rejected credentials");
            }
            AuthError::AccessDenied | AuthError::OwnerRequired | AuthError::AccountNotActive => {
                tracing::warn!(error = %self, "Access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

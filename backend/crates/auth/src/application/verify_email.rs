//! Verify Email
//!
//! PENDING_VERIFICATION -> ACTIVE

use chrono::Utc;
use platform::crypto::constant_time_eq;

use crate::application::coordinator::{AuthenticationCoordinator, UserView};
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::{token_kind::TokenKind, user_status::UserStatus};
use crate::error::{AuthError, AuthResult};

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    /// Consume a verification token.
    ///
    /// Only the most recently issued token for the identity is accepted, and
    /// only while the identity is still PENDING_VERIFICATION.
    pub async fn verify_email(&self, token: &str) -> AuthResult<UserView> {
        let user_id = self.verify_subject(token, TokenKind::Verification)?;

        let mut identity = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if identity.email_verified {
            return Err(AuthError::AlreadyVerified);
        }
        if identity.status != UserStatus::PendingVerification {
            tracing::warn!(
                user_id = %user_id,
                status = %identity.status,
                "Verification attempted outside PENDING_VERIFICATION"
            );
            return Err(AuthError::AccountNotActive);
        }

        let matches_stored = identity
            .verification_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), token.as_bytes()));
        if !matches_stored {
            tracing::warn!(user_id = %user_id, "Superseded verification token presented");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        identity.mark_verified(Utc::now());
        self.directory.update(&identity).await?;

        tracing::info!(user_id = %user_id, "Email verified");

        Ok(UserView::from(&identity))
    }
}

//! Password Reset
//!
//! Two steps, neither of which changes status:
//! 1. request: store a reset token with its expiry and mail it
//! 2. reset: consume the stored token and replace the password hash

use chrono::Utc;
use platform::crypto::constant_time_eq;
use platform::password::ClearTextPassword;

use crate::application::coordinator::AuthenticationCoordinator;
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::{email::Email, token_kind::TokenKind};
use crate::error::{AuthError, AuthResult};

pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    /// Issue a reset token. Any earlier reset token stops working.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = Email::new(email)?;

        let mut identity = self
            .directory
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let now = Utc::now();
        let token = self.codec.issue_password_reset(&identity.user_id);
        let expires_at = now
            + chrono::Duration::from_std(self.codec.ttls().password_reset)
                .map_err(|e| AuthError::Internal(e.to_string()))?;

        identity.begin_password_reset(token.clone(), expires_at, now);
        self.directory.update(&identity).await?;
        self.mailer
            .send_password_reset(&identity.email, &token)
            .await?;

        tracing::info!(user_id = %identity.user_id, "Password reset requested");

        Ok(())
    }

    pub async fn reset_password(&self, input: ResetPasswordInput) -> AuthResult<()> {
        let user_id = self.verify_subject(&input.token, TokenKind::PasswordReset)?;

        let mut identity = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let matches_stored = identity
            .password_reset_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), input.token.as_bytes()));
        if !matches_stored {
            tracing::warn!(user_id = %user_id, "Unknown or consumed reset token presented");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let now = Utc::now();
        if identity.reset_token_expired(now) {
            return Err(AuthError::ResetTokenExpired);
        }

        let password = ClearTextPassword::new(input.new_password)?;
        let password_hash = password
            .hash(self.config.pepper())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        identity.complete_password_reset(password_hash, now);
        self.directory.update(&identity).await?;

        tracing::info!(user_id = %user_id, "Password reset completed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::coordinator::test_support::{PASSWORD, active_user, coordinator};
    use crate::application::login::LoginInput;

    const NEW_PASSWORD: &str = "BrandNewSecret99";

    fn login(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn reset(token: &str, new_password: &str) -> ResetPasswordInput {
        ResetPasswordInput {
            token: token.to_string(),
            new_password: new_password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let (coordinator, directory, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "reset@example.com").await;

        coordinator
            .request_password_reset("Reset@Example.com")
            .await
            .unwrap();
        let token = mailer.last_reset_token().unwrap();

        let stored = directory.identity(&user.user_id).unwrap();
        assert_eq!(stored.password_reset_token.as_deref(), Some(token.as_str()));
        let expires_at = stored.password_reset_expires_at.unwrap();
        let remaining = expires_at - Utc::now();
        assert!(remaining <= chrono::Duration::hours(1));
        assert!(remaining > chrono::Duration::minutes(59));

        coordinator.reset_password(reset(&token, NEW_PASSWORD)).await.unwrap();

        let stored = directory.identity(&user.user_id).unwrap();
        assert!(stored.password_reset_token.is_none());
        assert!(stored.password_reset_expires_at.is_none());

        let err = coordinator
            .login(login("reset@example.com", PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialInvalid));
        coordinator
            .login(login("reset@example.com", NEW_PASSWORD))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_token_cannot_be_reused() {
        let (coordinator, _, mailer) = coordinator();
        active_user(&coordinator, &mailer, "reuse@example.com").await;
        coordinator
            .request_password_reset("reuse@example.com")
            .await
            .unwrap();
        let token = mailer.last_reset_token().unwrap();

        coordinator.reset_password(reset(&token, NEW_PASSWORD)).await.unwrap();
        let err = coordinator
            .reset_password(reset(&token, "AnotherSecret77"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_expired_stored_reset_token() {
        let (coordinator, directory, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "late@example.com").await;
        coordinator
            .request_password_reset("late@example.com")
            .await
            .unwrap();
        let token = mailer.last_reset_token().unwrap();

        let mut stored = directory.identity(&user.user_id).unwrap();
        stored.password_reset_expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        directory.put_identity(stored);

        let err = coordinator
            .reset_password(reset(&token, NEW_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ResetTokenExpired));
    }

    #[tokio::test]
    async fn test_reset_rejects_other_kinds_and_weak_passwords() {
        let (coordinator, _, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "kind@example.com").await;

        let access = coordinator.codec().issue_access(&user.user_id);
        let err = coordinator
            .reset_password(reset(&access, NEW_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));

        coordinator
            .request_password_reset("kind@example.com")
            .await
            .unwrap();
        let token = mailer.last_reset_token().unwrap();
        let err = coordinator
            .reset_password(reset(&token, "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));

        // a policy failure does not consume the token
        coordinator.reset_password(reset(&token, NEW_PASSWORD)).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_for_unknown_email() {
        let (coordinator, _, mailer) = coordinator();
        let err = coordinator
            .request_password_reset("ghost@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
        assert!(mailer.last_reset_token().is_none());
    }
}

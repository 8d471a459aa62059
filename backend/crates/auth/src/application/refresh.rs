//! Refresh
//!
//! Exchanges a refresh token for a new access/refresh pair. Status is
//! unchanged and not consulted; the bearer middleware rejects disabled
//! principals when the new access token is used.

use crate::application::coordinator::{AuthenticationCoordinator, TokenPair};
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::token_kind::TokenKind;
use crate::error::{AuthError, AuthResult};

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let user_id = self.verify_subject(refresh_token, TokenKind::Refresh)?;

        let identity = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(user_id = %user_id, "Tokens refreshed");

        Ok(self.issue_pair(&identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::coordinator::test_support::{PASSWORD, active_user, coordinator};
    use crate::application::login::LoginInput;
    use kernel::id::UserId;

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let (coordinator, _, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "r@example.com").await;
        let pair = coordinator
            .login(LoginInput {
                email: "r@example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();

        let rotated = coordinator.refresh(&pair.refresh_token).await.unwrap();
        let codec = coordinator.codec();
        let access = codec.verify(&rotated.access_token, TokenKind::Access).unwrap();
        let refresh = codec
            .verify(&rotated.refresh_token, TokenKind::Refresh)
            .unwrap();
        assert_eq!(access.user_id().unwrap(), user.user_id);
        assert_eq!(refresh.user_id().unwrap(), user.user_id);
        assert_eq!(rotated.user.email.as_str(), "r@example.com");
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let (coordinator, _, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "r@example.com").await;
        let access = coordinator.codec().issue_access(&user.user_id);

        let err = coordinator.refresh(&access).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let (coordinator, _, _) = coordinator();
        let token = coordinator.codec().issue_refresh(&UserId::new());

        let err = coordinator.refresh(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}

//! Authentication Coordinator
//!
//! Owns the account lifecycle state machine. Each transition lives in its
//! own module:
//!
//! | transition | module |
//! |---|---|
//! | register | [`super::register`] |
//! | verify email | [`super::verify_email`] |
//! | login | [`super::login`] |
//! | refresh | [`super::refresh`] |
//! | request / perform password reset | [`super::password_reset`] |
//!
//! Every token it issues carries the user id as subject, and every token it
//! accepts is resolved back through a lookup by id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::application::token_codec::TokenCodec;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::{email::Email, token_kind::TokenKind, user_status::UserStatus};
use crate::error::{AuthError, AuthResult};

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Public view of an identity. No credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub user_id: UserId,
    pub email: Email,
    pub status: UserStatus,
    pub email_verified: bool,
    pub roles: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id,
            email: identity.email.clone(),
            status: identity.status,
            email_verified: identity.email_verified,
            roles: identity.role_names(),
            last_login_at: identity.last_login_at,
        }
    }
}

/// Result of login and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime
    pub expires_in_ms: i64,
    pub user: UserView,
}

pub struct AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    pub(crate) directory: Arc<D>,
    pub(crate) mailer: Arc<M>,
    pub(crate) codec: Arc<TokenCodec>,
    pub(crate) config: Arc<AuthConfig>,
}

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    pub fn new(
        directory: Arc<D>,
        mailer: Arc<M>,
        codec: Arc<TokenCodec>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            directory,
            mailer,
            codec,
            config,
        }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub fn config(&self) -> &Arc<AuthConfig> {
        &self.config
    }

    /// Fresh access + refresh pair for an identity.
    pub(crate) fn issue_pair(&self, identity: &Identity) -> TokenPair {
        TokenPair {
            access_token: self.codec.issue_access(&identity.user_id),
            refresh_token: self.codec.issue_refresh(&identity.user_id),
            token_type: TOKEN_TYPE_BEARER,
            expires_in_ms: self.codec.ttls().access_ms(),
            user: UserView::from(identity),
        }
    }

    /// Verify a presented token and return its subject.
    ///
    /// The exact rejection reason is logged and then collapsed into
    /// `InvalidOrExpiredToken`.
    pub(crate) fn verify_subject(&self, token: &str, kind: TokenKind) -> AuthResult<UserId> {
        self.codec
            .verify(token, kind)
            .and_then(|claims| claims.user_id())
            .map_err(|reason| {
                tracing::warn!(kind = %kind, reason = %reason, "Token rejected");
                AuthError::InvalidOrExpiredToken
            })
    }
}

impl<D, M> Clone for AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            mailer: self.mailer.clone(),
            codec: self.codec.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::application::config::TokenTtls;
    use crate::application::token_codec::SigningKey;
    use crate::infra::memory::{MemoryDirectory, RecordingMailer};

    pub(crate) type TestCoordinator = AuthenticationCoordinator<MemoryDirectory, RecordingMailer>;

    pub(crate) const PASSWORD: &str = "CorrectHorse42";

    pub(crate) fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            SigningKey::new(b"test-signing-key-test-signing-key".to_vec()).unwrap(),
            TokenTtls::default(),
        ))
    }

    pub(crate) fn coordinator() -> (TestCoordinator, MemoryDirectory, RecordingMailer) {
        let directory = MemoryDirectory::with_default_roles();
        let mailer = RecordingMailer::default();
        let coordinator = AuthenticationCoordinator::new(
            Arc::new(directory.clone()),
            Arc::new(mailer.clone()),
            codec(),
            Arc::new(AuthConfig::default()),
        );
        (coordinator, directory, mailer)
    }

    /// Registered and verified account
    pub(crate) async fn active_user(
        coordinator: &TestCoordinator,
        mailer: &RecordingMailer,
        email: &str,
    ) -> UserView {
        coordinator
            .register(crate::application::register::RegisterInput {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        let token = mailer.last_verification_token().unwrap();
        coordinator.verify_email(&token).await.unwrap()
    }
}

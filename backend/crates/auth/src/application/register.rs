//! Register
//!
//! (none) -> PENDING_VERIFICATION

use chrono::Utc;
use platform::password::ClearTextPassword;

use crate::application::coordinator::{AuthenticationCoordinator, UserView};
use crate::domain::entity::identity::Identity;
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct RegisterInput {
    pub email: String,
    pub password: String,
}

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    /// Create an unverified identity with the default role and mail it a
    /// verification token.
    ///
    /// If the mail cannot be sent the identity is removed again, so the same
    /// email can register once delivery works.
    pub async fn register(&self, input: RegisterInput) -> AuthResult<UserView> {
        let email = Email::new(&input.email)?;

        if self.directory.exists_by_email(&email).await? {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let password = ClearTextPassword::new(input.password)?;
        let password_hash = password
            .hash(self.config.pepper())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let default_role = self
            .directory
            .find_role(&self.config.default_role)
            .await?
            .ok_or_else(|| {
                AuthError::Internal(format!("Default role {} is missing", self.config.default_role))
            })?;

        let now = Utc::now();
        let mut identity = Identity::register(email, password_hash, default_role, now);
        let token = self.codec.issue_verification(&identity.user_id);
        identity.set_verification_token(token.clone(), now);

        self.directory.create(&identity).await?;
        if let Err(err) = self
            .mailer
            .send_verification(&identity.email, &token)
            .await
        {
            // free the email for a retry
            tracing::warn!(
                user_id = %identity.user_id,
                "Verification mail failed, discarding registration"
            );
            self.directory.delete(&identity.user_id).await?;
            return Err(err);
        }

        tracing::info!(
            user_id = %identity.user_id,
            email = %identity.email,
            "User registered"
        );

        Ok(UserView::from(&identity))
    }
}

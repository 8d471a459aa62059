//! Login
//!
//! ACTIVE -> ACTIVE, records last login and issues an access/refresh pair.

use std::sync::LazyLock;

use chrono::Utc;
use platform::password::{ClearTextPassword, HashedPassword};

use crate::application::coordinator::{AuthenticationCoordinator, TokenPair};
use crate::domain::repository::{Mailer, UserDirectory};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl<D, M> AuthenticationCoordinator<D, M>
where
    D: UserDirectory,
    M: Mailer,
{
    /// Unknown email, malformed email and wrong password all fail with
    /// `CredentialInvalid`, each after one password verification. Status is
    /// only checked once the password matched.
    pub async fn login(&self, input: LoginInput) -> AuthResult<TokenPair> {
        let password = ClearTextPassword::presented(input.password);

        let found = match Email::new(&input.email) {
            Ok(email) => self.directory.find_by_email(&email).await?,
            Err(_) => None,
        };
        let Some(mut identity) = found else {
            verify_against_decoy(&password, self.config.pepper());
            return Err(AuthError::CredentialInvalid);
        };

        if !identity
            .password_hash
            .verify(&password, self.config.pepper())
        {
            return Err(AuthError::CredentialInvalid);
        }

        if !identity.is_enabled() {
            tracing::warn!(
                user_id = %identity.user_id,
                status = %identity.status,
                "Login attempt on inactive account"
            );
            return Err(AuthError::AccountNotActive);
        }

        identity.record_login(Utc::now());
        self.directory.update(&identity).await?;

        tracing::info!(user_id = %identity.user_id, "User logged in");

        Ok(self.issue_pair(&identity))
    }
}

/// Argon2id hash of a throwaway password, made with the same parameters as
/// stored hashes.
static DECOY_HASH: LazyLock<Option<HashedPassword>> = LazyLock::new(|| {
    ClearTextPassword::presented("decoy-password-never-matches".to_string())
        .hash(None)
        .ok()
});

/// Spend one password verification when no identity matched, so an unknown
/// email costs the same as a wrong password. Returns whether a hash ran.
fn verify_against_decoy(password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
    match DECOY_HASH.as_ref() {
        Some(decoy) => {
            let _ = decoy.verify(password, pepper);
            true
        }
        None => {
            tracing::error!("Decoy password hash unavailable");
            false
        }
    }
}

//! Collaborator Traits
//!
//! Narrow interfaces to the parts of the system this crate does not own.
//! Implementations live in the infrastructure layer.

use kernel::id::{ProjectId, UserId};

use crate::domain::entity::{identity::Identity, role::Role};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// Identity lookup and the mutations the coordinator needs.
///
/// Identities are always returned with their roles and each role's
/// permissions attached.
#[trait_variant::make(UserDirectory: Send)]
pub trait LocalUserDirectory {
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<Identity>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// Look up a role (with permissions) by exact name
    async fn find_role(&self, name: &str) -> AuthResult<Option<Role>>;

    /// Persist a new identity and its role assignments.
    ///
    /// Fails with `EmailAlreadyInUse` if the email was taken concurrently.
    async fn create(&self, identity: &Identity) -> AuthResult<()>;

    /// Persist scalar fields. Role assignments are left untouched.
    async fn update(&self, identity: &Identity) -> AuthResult<()>;

    /// Remove an identity and its role assignments. Unknown ids are a no-op.
    async fn delete(&self, user_id: &UserId) -> AuthResult<()>;
}

/// Tenant membership. Answers are never cached by callers.
#[trait_variant::make(MembershipOracle: Send)]
pub trait LocalMembershipOracle {
    /// Owner or member
    async fn has_access(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool>;

    async fn is_owner(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool>;
}

/// Out-of-band delivery of single-use tokens.
#[trait_variant::make(Mailer: Send)]
pub trait LocalMailer {
    async fn send_verification(&self, to: &Email, token: &str) -> AuthResult<()>;

    async fn send_password_reset(&self, to: &Email, token: &str) -> AuthResult<()>;
}

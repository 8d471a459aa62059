//! Identity Entity
//!
//! A registered account together with its credential state and role set.
//! Token operations never mutate it; the coordinator does, through the
//! transition methods below.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::entity::role::Role;
use crate::domain::value_object::{email::Email, user_status::UserStatus};

#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Email,
    pub password_hash: HashedPassword,
    pub status: UserStatus,
    pub email_verified: bool,
    pub roles: Vec<Role>,
    /// Outstanding verification token, cleared once verified
    pub verification_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// New, unverified identity holding a single role.
    pub fn register(
        email: Email,
        password_hash: HashedPassword,
        default_role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            email,
            password_hash,
            status: UserStatus::PendingVerification,
            email_verified: false,
            roles: vec![default_role],
            verification_token: None,
            password_reset_token: None,
            password_reset_expires_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    pub fn set_verification_token(&mut self, token: String, now: DateTime<Utc>) {
        self.verification_token = Some(token);
        self.updated_at = now;
    }

    /// PENDING_VERIFICATION -> ACTIVE
    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.status = UserStatus::Active;
        self.verification_token = None;
        self.updated_at = now;
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Replaces any outstanding reset token.
    pub fn begin_password_reset(
        &mut self,
        token: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.password_reset_token = Some(token);
        self.password_reset_expires_at = Some(expires_at);
        self.updated_at = now;
    }

    pub fn reset_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.password_reset_expires_at
            .is_some_and(|expires_at| expires_at <= now)
    }

    pub fn complete_password_reset(&mut self, password_hash: HashedPassword, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.password_reset_token = None;
        self.password_reset_expires_at = None;
        self.updated_at = now;
    }
}

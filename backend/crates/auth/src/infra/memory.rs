//! In-memory collaborators
//!
//! `MemoryDirectory` implements both [`UserDirectory`] and
//! [`MembershipOracle`] over a shared map; `RecordingMailer` keeps every
//! dispatched token. Used by tests and local runs without a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use kernel::id::{ProjectId, UserId};

use crate::domain::entity::{identity::Identity, role::Role};
use crate::domain::repository::{Mailer, MembershipOracle, UserDirectory};
use crate::domain::value_object::{email::Email, user_status::UserStatus};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct DirectoryState {
    identities: HashMap<UserId, Identity>,
    roles: HashMap<String, Role>,
    members: HashSet<(UserId, ProjectId)>,
    owners: HashSet<(UserId, ProjectId)>,
}

#[derive(Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
    membership_checks: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::Internal("directory lock poisoned".to_string())
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with the `USER` and `ADMIN` roles.
    pub fn with_default_roles() -> Self {
        let directory = Self::new();
        directory.insert_role(Role::with_permissions("USER", ["project:read"]));
        directory.insert_role(Role::with_permissions(
            "ADMIN",
            ["project:read", "project:write", "user:manage"],
        ));
        directory
    }

    pub fn insert_role(&self, role: Role) {
        if let Ok(mut state) = self.state.write() {
            state.roles.insert(role.name.clone(), role);
        }
    }

    pub fn remove_role(&self, name: &str) {
        if let Ok(mut state) = self.state.write() {
            state.roles.remove(name);
        }
    }

    /// Insert or replace an identity as-is.
    pub fn put_identity(&self, identity: Identity) {
        if let Ok(mut state) = self.state.write() {
            state.identities.insert(identity.user_id, identity);
        }
    }

    pub fn identity(&self, user_id: &UserId) -> Option<Identity> {
        self.state.read().ok()?.identities.get(user_id).cloned()
    }

    pub fn identity_count(&self) -> usize {
        self.state.read().map(|s| s.identities.len()).unwrap_or(0)
    }

    pub fn set_status(&self, user_id: &UserId, status: UserStatus) {
        if let Ok(mut state) = self.state.write() {
            if let Some(identity) = state.identities.get_mut(user_id) {
                identity.status = status;
            }
        }
    }

    pub fn grant_access(&self, user_id: UserId, project_id: ProjectId) {
        if let Ok(mut state) = self.state.write() {
            state.members.insert((user_id, project_id));
        }
    }

    /// Owners always have access.
    pub fn grant_ownership(&self, user_id: UserId, project_id: ProjectId) {
        if let Ok(mut state) = self.state.write() {
            state.owners.insert((user_id, project_id));
        }
    }

    /// Number of `has_access` calls answered so far
    pub fn membership_checks(&self) -> usize {
        self.membership_checks.load(Ordering::SeqCst)
    }

    /// Make membership lookups fail, as a database outage would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<Identity>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.identities.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .identities
            .values()
            .find(|identity| &identity.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.identities.values().any(|identity| &identity.email == email))
    }

    async fn find_role(&self, name: &str) -> AuthResult<Option<Role>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.roles.get(name).cloned())
    }

    async fn create(&self, identity: &Identity) -> AuthResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.identities.values().any(|i| i.email == identity.email) {
            return Err(AuthError::EmailAlreadyInUse);
        }
        state.identities.insert(identity.user_id, identity.clone());
        Ok(())
    }

    async fn update(&self, identity: &Identity) -> AuthResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .identities
            .get_mut(&identity.user_id)
            .ok_or(AuthError::UserNotFound)?;
        let roles = std::mem::take(&mut stored.roles);
        *stored = Identity {
            roles,
            ..identity.clone()
        };
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> AuthResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.identities.remove(user_id);
        Ok(())
    }
}

impl MembershipOracle for MemoryDirectory {
    async fn has_access(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool> {
        self.membership_checks.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Internal("membership store unavailable".to_string()));
        }
        let state = self.state.read().map_err(poisoned)?;
        let key = (*user_id, *project_id);
        Ok(state.owners.contains(&key) || state.members.contains(&key))
    }

    async fn is_owner(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Internal("membership store unavailable".to_string()));
        }
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.owners.contains(&(*user_id, *project_id)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: MailKind,
    pub to: Email,
    pub token: String,
}

/// Mailer that keeps every message instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn last_token(&self, kind: MailKind) -> Option<String> {
        self.sent
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|m| m.kind == kind)
            .map(|m| m.token.clone())
    }

    pub fn last_verification_token(&self) -> Option<String> {
        self.last_token(MailKind::Verification)
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.last_token(MailKind::PasswordReset)
    }

    /// Make every subsequent dispatch fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, kind: MailKind, to: &Email, token: &str) -> AuthResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::MailDelivery("relay refused message".to_string()));
        }
        self.sent.lock().map_err(poisoned)?.push(SentMail {
            kind,
            to: to.clone(),
            token: token.to_string(),
        });
        Ok(())
    }
}

impl Mailer for RecordingMailer {
    async fn send_verification(&self, to: &Email, token: &str) -> AuthResult<()> {
        self.record(MailKind::Verification, to, token)
    }

    async fn send_password_reset(&self, to: &Email, token: &str) -> AuthResult<()> {
        self.record(MailKind::PasswordReset, to, token)
    }
}

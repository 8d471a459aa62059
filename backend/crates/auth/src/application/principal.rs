//! Principal Resolution
//!
//! Flattens an identity's two-level role/permission graph into the
//! authority set used for authorization checks. Recomputed on every
//! resolution; nothing is cached.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use kernel::id::UserId;

use crate::domain::entity::{identity::Identity, role::Role};
use crate::domain::value_object::{authority::Authority, email::Email};

/// Authenticated identity as seen by request handling.
///
/// Equality and hashing use the user id only.
#[derive(Debug, Clone)]
pub struct Principal {
    user_id: UserId,
    email: Email,
    enabled: bool,
    authorities: BTreeSet<Authority>,
}

impl Principal {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn has_role(&self, role_name: &str) -> bool {
        self.authorities.contains(&Authority::role(role_name))
    }

    pub fn has_permission(&self, permission_name: &str) -> bool {
        self.authorities
            .contains(&Authority::permission(permission_name))
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.user_id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalResolver;

impl PrincipalResolver {
    pub fn resolve(&self, identity: &Identity) -> Principal {
        Principal {
            user_id: identity.user_id,
            email: identity.email.clone(),
            enabled: identity.is_enabled(),
            authorities: authorities_of(&identity.roles),
        }
    }
}

/// `ROLE_<NAME>` per role plus `PERMISSION_<name>` per permission of each role.
pub fn authorities_of(roles: &[Role]) -> BTreeSet<Authority> {
    roles
        .iter()
        .flat_map(|role| {
            std::iter::once(Authority::role(&role.name)).chain(
                role.permissions
                    .iter()
                    .map(|p| Authority::permission(&p.name)),
            )
        })
        .collect()
}

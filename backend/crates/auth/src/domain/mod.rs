//! Domain Layer
//!
//! Identities, roles, value objects and the collaborator traits the
//! application layer depends on.

pub mod entity;
pub mod repository;
pub mod value_object;

pub use entity::{identity::Identity, role::{Permission, Role}};
pub use repository::{Mailer, MembershipOracle, UserDirectory};

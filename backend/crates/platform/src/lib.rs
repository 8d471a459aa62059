//! Platform Crate - Technical Infrastructure
//!
//! Technical building blocks with no knowledge of users or tenants:
//! - Constant-time comparison
//! - Password hashing (Argon2id) and password policy
//! - `Authorization: Bearer` header extraction

pub mod bearer;
pub mod crypto;
pub mod password;

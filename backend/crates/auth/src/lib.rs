//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Identities, roles, token kinds, collaborator traits
//! - `application/` - Token codec, principal resolution, account lifecycle
//! - `infra/` - PostgreSQL and in-memory collaborators
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Email + password registration with email verification
//! - Stateless HS256 bearer tokens (access, refresh, verification, password reset)
//! - Role and permission authorities per request
//! - Tenant guard: every request targeting a project is checked for membership
//!
//! ## Security Model
//! - Passwords hashed with Argon2id
//! - Every token carries the user id as subject and a kind tag
//! - Token signatures compared in constant time
//! - The request scope never outlives the request task

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::{
    AccessScope, AuthConfig, AuthenticationCoordinator, Principal, PrincipalResolver, SigningKey,
    TokenCodec, TokenTtls,
};
pub use error::{AuthError, AuthResult};
pub use infra::{LogMailer, MemoryDirectory, PgDirectory};
pub use presentation::router::{api_router, auth_router, project_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::postgres::PgDirectory as AuthStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::access_scope::*;
    pub use crate::presentation::middleware::*;
}

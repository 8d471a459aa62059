//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, bearer middleware and the tenant guard.

pub mod access_scope;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use access_scope::{
    AccessScopeFilterState, PROJECT_ID_HEADER, ProjectScoped, access_scope_filter, ensure_owner,
    resolve_project_id,
};
pub use handlers::{AuthAppState, ProjectAppState};
pub use middleware::{AuthMiddlewareState, authenticate_bearer, require_principal};
pub use router::{api_router, auth_router, project_router};

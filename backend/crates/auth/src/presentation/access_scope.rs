//! Access Scope Filter
//!
//! Runs after bearer authentication. Resolves the target project of the
//! request, checks membership for the authenticated user and installs the
//! resulting [`AccessScope`] for the downstream handler.
//!
//! Project resolution:
//! 1. `X-Project-ID` header, when present and non-empty
//! 2. first path segment after `/api/projects/`, unless it names a route
//!    (see [`AuthConfig::reserved_project_segments`])

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OriginalUri, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::{ProjectId, UserId};

use crate::application::access_scope::AccessScope;
use crate::application::config::AuthConfig;
use crate::application::principal::Principal;
use crate::domain::repository::MembershipOracle;
use crate::error::{AuthError, AuthResult};

pub const PROJECT_ID_HEADER: &str = "x-project-id";
pub const PROJECT_PATH_PREFIX: &str = "/api/projects/";

#[derive(Clone)]
pub struct AccessScopeFilterState<O>
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    pub oracle: Arc<O>,
    pub config: Arc<AuthConfig>,
}

impl<O> AccessScopeFilterState<O>
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    pub fn new(oracle: Arc<O>, config: Arc<AuthConfig>) -> Self {
        Self { oracle, config }
    }
}

/// Project the request targets, if any.
///
/// The header wins over the path. A candidate that is not a UUID is
/// `TenantIdMalformed`.
pub fn resolve_project_id(
    headers: &HeaderMap,
    path: &str,
    config: &AuthConfig,
) -> AuthResult<Option<ProjectId>> {
    if let Some(value) = headers.get(PROJECT_ID_HEADER) {
        let value = value.to_str().map_err(|_| AuthError::TenantIdMalformed)?;
        if !value.trim().is_empty() {
            return parse_project_id(value).map(Some);
        }
    }

    let Some(rest) = path.strip_prefix(PROJECT_PATH_PREFIX) else {
        return Ok(None);
    };
    let segment = rest.split('/').next().unwrap_or_default();
    if segment.is_empty() || config.is_reserved_segment(segment) {
        return Ok(None);
    }

    parse_project_id(segment).map(Some)
}

fn parse_project_id(candidate: &str) -> AuthResult<ProjectId> {
    candidate.parse().map_err(|_| {
        tracing::debug!(candidate = %candidate, "Project id is not a UUID");
        AuthError::TenantIdMalformed
    })
}

/// Tenant guard middleware.
///
/// Anonymous requests pass through without a project. A membership denial
/// or lookup failure stops the request before the handler runs.
pub async fn access_scope_filter<O>(
    State(state): State<AccessScopeFilterState<O>>,
    mut req: Request,
    next: Next,
) -> AuthResult<Response>
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    let user_id = req.extensions().get::<Principal>().map(Principal::user_id);

    let path = match req.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.path().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let requested = resolve_project_id(req.headers(), &path, &state.config)?;

    let project_id = match (user_id, requested) {
        (Some(user_id), Some(project_id)) => {
            if !state.oracle.has_access(&user_id, &project_id).await? {
                tracing::warn!(
                    user_id = %user_id,
                    project_id = %project_id,
                    "Project access denied"
                );
                return Err(AuthError::AccessDenied);
            }
            Some(project_id)
        }
        _ => None,
    };

    let scope = AccessScope::new(user_id, project_id);
    req.extensions_mut().insert(scope);

    Ok(scope.scope(next.run(req)).await)
}

impl<S> FromRequestParts<S> for AccessScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AccessScope>()
            .copied()
            .unwrap_or_else(AccessScope::current))
    }
}

/// Handler argument for routes that only make sense inside a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectScoped {
    pub user_id: UserId,
    pub project_id: ProjectId,
}

impl TryFrom<AccessScope> for ProjectScoped {
    type Error = AuthError;

    fn try_from(scope: AccessScope) -> Result<Self, Self::Error> {
        match (scope.current_user_id(), scope.current_project_id()) {
            (Some(user_id), Some(project_id)) => Ok(Self {
                user_id,
                project_id,
            }),
            _ => Err(AuthError::ProjectScopeRequired),
        }
    }
}

impl<S> FromRequestParts<S> for ProjectScoped
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(scope) = AccessScope::from_request_parts(parts, state).await;
        ProjectScoped::try_from(scope)
    }
}

/// Owner-only operations
pub async fn ensure_owner<O>(oracle: &O, scoped: &ProjectScoped) -> AuthResult<()>
where
    O: MembershipOracle,
{
    if oracle.is_owner(&scoped.user_id, &scoped.project_id).await? {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %scoped.user_id,
            project_id = %scoped.project_id,
            "Owner-only operation refused"
        );
        Err(AuthError::OwnerRequired)
    }
}

//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::application::coordinator::AuthenticationCoordinator;
use crate::application::login::LoginInput;
use crate::application::password_reset::ResetPasswordInput;
use crate::application::principal::Principal;
use crate::application::register::RegisterInput;
use crate::domain::repository::{Mailer, MembershipOracle, UserDirectory};
use crate::error::AuthResult;
use crate::presentation::access_scope::ProjectScoped;
use crate::presentation::dto::{
    LoginRequest, MeResponse, MessageResponse, PasswordResetRequest, ProjectAccessResponse,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPairResponse, UserResponse,
    VerifyEmailRequest,
};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<D, M>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    pub coordinator: AuthenticationCoordinator<D, M>,
}

/// Shared state for project handlers
#[derive(Clone)]
pub struct ProjectAppState<O>
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    pub oracle: Arc<O>,
}

// ============================================================================
// Account Lifecycle
// ============================================================================

/// POST /api/auth/register
pub async fn register<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<UserResponse>)>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    let user = state
        .coordinator
        .register(RegisterInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/auth/verify-email
pub async fn verify_email<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    state.coordinator.verify_email(&req.token).await?;

    Ok(Json(MessageResponse::new("Email verified")))
}

/// POST /api/auth/login
pub async fn login<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<TokenPairResponse>>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    let pair = state
        .coordinator
        .login(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(pair.into()))
}

/// POST /api/auth/refresh
pub async fn refresh<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<Json<TokenPairResponse>>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    let pair = state.coordinator.refresh(&req.refresh_token).await?;

    Ok(Json(pair.into()))
}

// ============================================================================
// Password Reset
// ============================================================================

/// POST /api/auth/request-password-reset
pub async fn request_password_reset<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<PasswordResetRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    state.coordinator.request_password_reset(&req.email).await?;

    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// POST /api/auth/reset-password
pub async fn reset_password<D, M>(
    State(state): State<AuthAppState<D, M>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    state
        .coordinator
        .reset_password(ResetPasswordInput {
            token: req.token,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset")))
}

// ============================================================================
// Authenticated
// ============================================================================

/// GET /api/auth/me
pub async fn me(principal: Principal) -> Json<MeResponse> {
    Json(MeResponse::from(&principal))
}

/// GET /api/projects/{id}/access
///
/// Reports the project the request was scoped to, which is the
/// `X-Project-ID` header when one was sent.
pub async fn project_access<O>(
    State(state): State<ProjectAppState<O>>,
    scoped: ProjectScoped,
) -> AuthResult<Json<ProjectAccessResponse>>
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    let is_owner = state
        .oracle
        .is_owner(&scoped.user_id, &scoped.project_id)
        .await?;

    tracing::debug!(
        user_id = %scoped.user_id,
        project_id = %scoped.project_id,
        "Project access checked"
    );

    Ok(Json(ProjectAccessResponse {
        project_id: scoped.project_id.to_string(),
        has_access: true,
        is_owner,
    }))
}

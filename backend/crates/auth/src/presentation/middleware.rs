//! Bearer Authentication Middleware
//!
//! Resolves `Authorization: Bearer <access token>` into a [`Principal`] and
//! attaches it to the request extensions. Requests without a bearer header
//! continue anonymously; every other failure is a 401.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use platform::bearer::bearer_token;

use crate::application::principal::{Principal, PrincipalResolver};
use crate::application::token_codec::TokenCodec;
use crate::domain::repository::UserDirectory;
use crate::domain::value_object::token_kind::TokenKind;
use crate::error::{AuthError, AuthResult};

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState<D>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
{
    pub directory: Arc<D>,
    pub codec: Arc<TokenCodec>,
}

impl<D> AuthMiddlewareState<D>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
{
    pub fn new(directory: Arc<D>, codec: Arc<TokenCodec>) -> Self {
        Self { directory, codec }
    }

    /// Access token -> enabled principal
    pub async fn authenticate(&self, token: &str) -> AuthResult<Principal> {
        let user_id = self
            .codec
            .verify(token, TokenKind::Access)
            .and_then(|claims| claims.user_id())
            .map_err(|reason| {
                tracing::warn!(reason = %reason, "Bearer token rejected");
                AuthError::InvalidOrExpiredToken
            })?;

        let identity = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Bearer token for unknown user");
                AuthError::Unauthenticated
            })?;

        let principal = PrincipalResolver.resolve(&identity);
        if !principal.is_enabled() {
            tracing::warn!(
                user_id = %user_id,
                status = %identity.status,
                "Bearer token for disabled account"
            );
            return Err(AuthError::Unauthenticated);
        }

        Ok(principal)
    }
}

/// Attach the bearer principal, if any.
pub async fn authenticate_bearer<D>(
    State(state): State<AuthMiddlewareState<D>>,
    mut req: Request,
    next: Next,
) -> AuthResult<Response>
where
    D: UserDirectory + Clone + Send + Sync + 'static,
{
    let token = match bearer_token(req.headers()) {
        Ok(Some(token)) => token.to_owned(),
        Ok(None) => return Ok(next.run(req).await),
        Err(e) => {
            tracing::warn!(reason = %e, "Malformed Authorization header");
            return Err(AuthError::InvalidOrExpiredToken);
        }
    };

    let principal = state.authenticate(&token).await?;
    tracing::debug!(user_id = %principal.user_id(), "Request authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Reject anonymous requests. Must run after [`authenticate_bearer`].
pub async fn require_principal(req: Request, next: Next) -> AuthResult<Response> {
    if req.extensions().get::<Principal>().is_none() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::coordinator::test_support::{active_user, codec, coordinator};
    use crate::domain::value_object::user_status::UserStatus;
    use crate::infra::memory::MemoryDirectory;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use axum::{Router, middleware};
    use kernel::id::UserId;
    use tower::ServiceExt;

    async fn whoami(principal: Principal) -> String {
        principal.user_id().to_string()
    }

    async fn anonymous_ok(req: Request) -> &'static str {
        if req.extensions().get::<Principal>().is_some() {
            "principal"
        } else {
            "anonymous"
        }
    }

    fn app(directory: MemoryDirectory, codec: Arc<TokenCodec>) -> Router {
        let state = AuthMiddlewareState::new(Arc::new(directory), codec);
        Router::new()
            .route(
                "/me",
                get(whoami).route_layer(middleware::from_fn(require_principal)),
            )
            .route("/open", get(anonymous_ok))
            .layer(middleware::from_fn_with_state(
                state,
                authenticate_bearer::<MemoryDirectory>,
            ))
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_access_token_attaches_principal() {
        let (coordinator, directory, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "bearer@example.com").await;
        let token = coordinator.codec().issue_access(&user.user_id);

        let response = app(directory, coordinator.codec().clone())
            .oneshot(get_with("/me", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, user.user_id.to_string());
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let router = app(MemoryDirectory::new(), codec());

        let response = router
            .clone()
            .oneshot(get_with("/open", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");

        let response = router.oneshot(get_with("/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_tokens_are_401() {
        let (coordinator, directory, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "bearer@example.com").await;
        let codec = coordinator.codec().clone();

        let refresh = codec.issue_refresh(&user.user_id);
        let unknown = codec.issue_access(&UserId::new());
        let expired = codec.issue_at(
            &user.user_id.to_string(),
            TokenKind::Access,
            std::time::Duration::from_millis(1),
            0,
        );

        for value in [
            format!("Bearer {refresh}"),
            format!("Bearer {unknown}"),
            format!("Bearer {expired}"),
            "Bearer not.a.token".to_string(),
            "Bearer ".to_string(),
        ] {
            let response = app(directory.clone(), codec.clone())
                .oneshot(get_with("/open", Some(&value)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value}");
        }
    }

    #[tokio::test]
    async fn test_disabled_account_is_401() {
        let (coordinator, directory, mailer) = coordinator();
        let user = active_user(&coordinator, &mailer, "gone@example.com").await;
        let token = coordinator.codec().issue_access(&user.user_id);
        directory.set_status(&user.user_id, UserStatus::Suspended);

        let response = app(directory, coordinator.codec().clone())
            .oneshot(get_with("/open", Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_schemes_are_ignored() {
        let response = app(MemoryDirectory::new(), codec())
            .oneshot(get_with("/open", Some("Basic dXNlcjpwYXNz")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }
}

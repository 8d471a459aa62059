//! Auth Router

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::application::config::AuthConfig;
use crate::application::coordinator::AuthenticationCoordinator;
use crate::application::token_codec::TokenCodec;
use crate::domain::repository::{Mailer, MembershipOracle, UserDirectory};
use crate::presentation::access_scope::{AccessScopeFilterState, access_scope_filter};
use crate::presentation::handlers::{self, AuthAppState, ProjectAppState};
use crate::presentation::middleware::{AuthMiddlewareState, authenticate_bearer, require_principal};

/// Account lifecycle routes, nested under `/api/auth`.
///
/// `/me` needs [`authenticate_bearer`] to run somewhere above this router.
pub fn auth_router<D, M>(coordinator: AuthenticationCoordinator<D, M>) -> Router
where
    D: UserDirectory + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    let state = AuthAppState { coordinator };

    Router::new()
        .route("/register", post(handlers::register::<D, M>))
        .route("/login", post(handlers::login::<D, M>))
        .route("/refresh", post(handlers::refresh::<D, M>))
        .route("/verify-email", post(handlers::verify_email::<D, M>))
        .route(
            "/request-password-reset",
            post(handlers::request_password_reset::<D, M>),
        )
        .route("/reset-password", post(handlers::reset_password::<D, M>))
        .route(
            "/me",
            get(handlers::me).route_layer(middleware::from_fn(require_principal)),
        )
        .with_state(state)
}

/// Project routes, nested under `/api/projects`. All of them need a
/// principal.
pub fn project_router<O>(oracle: Arc<O>) -> Router
where
    O: MembershipOracle + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/{id}/access", get(handlers::project_access::<O>))
        .route_layer(middleware::from_fn(require_principal))
        .with_state(ProjectAppState { oracle })
}

/// Full API surface with bearer authentication and the tenant guard
/// applied to every route.
///
/// Verification and password reset can only complete if `mailer` actually
/// reaches the user. [`LogMailer`](crate::infra::LogMailer) does so only with
/// token logging on.
pub fn api_router<D, M>(
    directory: Arc<D>,
    mailer: Arc<M>,
    codec: Arc<TokenCodec>,
    config: Arc<AuthConfig>,
) -> Router
where
    D: UserDirectory + MembershipOracle + Clone + Send + Sync + 'static,
    M: Mailer + Clone + Send + Sync + 'static,
{
    let coordinator =
        AuthenticationCoordinator::new(directory.clone(), mailer, codec.clone(), config.clone());
    let filter = AccessScopeFilterState::new(directory.clone(), config);
    let bearer = AuthMiddlewareState::new(directory.clone(), codec);

    // Layers run bottom-up: bearer authentication, then the tenant guard.
    Router::new()
        .nest("/api/auth", auth_router(coordinator))
        .nest("/api/projects", project_router(directory))
        .layer(middleware::from_fn_with_state(
            filter,
            access_scope_filter::<D>,
        ))
        .layer(middleware::from_fn_with_state(
            bearer,
            authenticate_bearer::<D>,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::coordinator::test_support::codec;
    use crate::infra::memory::{MemoryDirectory, RecordingMailer};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use kernel::id::ProjectId;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        directory: MemoryDirectory,
        mailer: RecordingMailer,
    }

    fn app() -> TestApp {
        let directory = MemoryDirectory::with_default_roles();
        let mailer = RecordingMailer::default();
        let router = api_router(
            Arc::new(directory.clone()),
            Arc::new(mailer.clone()),
            codec(),
            Arc::new(AuthConfig::default()),
        );
        TestApp {
            router,
            directory,
            mailer,
        }
    }

    impl TestApp {
        async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
            let response: Response = self.router.clone().oneshot(req).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            let req = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.call(req).await
        }

        async fn get(&self, uri: &str, access_token: Option<&str>) -> (StatusCode, Value) {
            let mut builder = Request::builder().uri(uri);
            if let Some(token) = access_token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            self.call(builder.body(Body::empty()).unwrap()).await
        }

        /// Register, verify and log in; returns (user id, access, refresh)
        async fn signed_in(&self, email: &str) -> (String, String, String) {
            let (status, user) = self
                .post(
                    "/api/auth/register",
                    json!({"email": email, "password": "CorrectHorse42"}),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);

            let token = self.mailer.last_verification_token().unwrap();
            let (status, _) = self
                .post("/api/auth/verify-email", json!({"token": token}))
                .await;
            assert_eq!(status, StatusCode::OK);

            let (status, pair) = self
                .post(
                    "/api/auth/login",
                    json!({"email": email, "password": "CorrectHorse42"}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);

            (
                user["userId"].as_str().unwrap().to_string(),
                pair["accessToken"].as_str().unwrap().to_string(),
                pair["refreshToken"].as_str().unwrap().to_string(),
            )
        }
    }

    #[tokio::test]
    async fn test_register_verify_login_me() {
        let app = app();

        let (status, user) = app
            .post(
                "/api/auth/register",
                json!({"email": "Flow@Example.com", "password": "CorrectHorse42"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["email"], "flow@example.com");
        assert_eq!(user["status"], "PENDING_VERIFICATION");
        assert_eq!(user["emailVerified"], false);
        assert_eq!(user["roles"], json!(["USER"]));

        let token = app.mailer.last_verification_token().unwrap();
        let (status, _) = app
            .post("/api/auth/verify-email", json!({"token": token}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .post("/api/auth/verify-email", json!({"token": token}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email is already verified");

        let (status, pair) = app
            .post(
                "/api/auth/login",
                json!({"email": "flow@example.com", "password": "CorrectHorse42"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pair["tokenType"], "Bearer");
        assert_eq!(pair["expiresIn"], 900_000);
        assert!(pair["user"]["lastLoginAt"].is_i64());

        let access = pair["accessToken"].as_str().unwrap();
        let (status, me) = app.get("/api/auth/me", Some(access)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["userId"], user["userId"]);
        assert_eq!(me["authorities"], json!(["PERMISSION_project:read", "ROLE_USER"]));
    }

    #[tokio::test]
    async fn test_me_requires_principal() {
        let app = app();

        let (status, body) = app.get("/api/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_credential() {
        let app = app();
        let (_, access, refresh) = app.signed_in("kinds@example.com").await;

        let (status, _) = app.get("/api/auth/me", Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .post("/api/auth/refresh", json!({"refreshToken": access}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");

        let (status, pair) = app
            .post("/api/auth/refresh", json!({"refreshToken": refresh}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair["accessToken"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_registration_and_bad_login() {
        let app = app();
        app.signed_in("dup@example.com").await;

        let (status, _) = app
            .post(
                "/api/auth/register",
                json!({"email": "DUP@example.com", "password": "CorrectHorse42"}),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .post(
                "/api/auth/login",
                json!({"email": "dup@example.com", "password": "WrongHorse42"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_password_reset_over_http() {
        let app = app();
        app.signed_in("forgot@example.com").await;

        let (status, _) = app
            .post(
                "/api/auth/request-password-reset",
                json!({"email": "forgot@example.com"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = app.mailer.last_reset_token().unwrap();

        let (status, _) = app
            .post(
                "/api/auth/reset-password",
                json!({"token": token, "newPassword": "BrandNewSecret99"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .post(
                "/api/auth/login",
                json!({"email": "forgot@example.com", "password": "BrandNewSecret99"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_project_access_check() {
        let app = app();
        let (user_id, access, _) = app.signed_in("owner@example.com").await;
        let user_id = user_id.parse().unwrap();
        let (owned, joined, foreign) = (ProjectId::new(), ProjectId::new(), ProjectId::new());
        app.directory.grant_ownership(user_id, owned);
        app.directory.grant_access(user_id, joined);

        let (status, body) = app
            .get(&format!("/api/projects/{owned}/access"), Some(&access))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"projectId": owned.to_string(), "hasAccess": true, "isOwner": true})
        );

        let (status, body) = app
            .get(&format!("/api/projects/{joined}/access"), Some(&access))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isOwner"], false);

        let (status, body) = app
            .get(&format!("/api/projects/{foreign}/access"), Some(&access))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied to project");

        let (status, _) = app
            .get("/api/projects/not-a-uuid/access", Some(&access))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_project_access_without_principal() {
        let app = app();

        let (status, body) = app
            .get(&format!("/api/projects/{}/access", ProjectId::new()), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authentication required");
        assert_eq!(app.directory.membership_checks(), 0);
    }

    #[tokio::test]
    async fn test_project_access_on_reserved_segment() {
        let app = app();
        let (_, access, _) = app.signed_in("search@example.com").await;

        let (status, body) = app.get("/api/projects/search/access", Some(&access)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Project scope required");
        assert_eq!(app.directory.membership_checks(), 0);
    }
}

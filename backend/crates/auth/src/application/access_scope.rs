//! Access Scope
//!
//! Request-lifetime pair of (current user, current project).
//!
//! The scope travels two ways:
//! - as a value in the request extensions, for handlers that extract it
//! - in a task-local slot that exists only while the downstream future is
//!   being polled, for code that has no access to the request
//!
//! The task-local slot is entered with [`AccessScope::scope`] and ends when
//! that future completes, returns an error, unwinds or is dropped. Outside of
//! it, [`AccessScope::current`] is empty.

use std::future::Future;

use kernel::id::{ProjectId, UserId};

tokio::task_local! {
    static CURRENT_SCOPE: AccessScope;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessScope {
    user_id: Option<UserId>,
    project_id: Option<ProjectId>,
}

impl AccessScope {
    pub const EMPTY: AccessScope = AccessScope {
        user_id: None,
        project_id: None,
    };

    /// A project is only ever recorded together with the user it was checked for.
    pub fn new(user_id: Option<UserId>, project_id: Option<ProjectId>) -> Self {
        Self {
            user_id,
            project_id: user_id.and(project_id),
        }
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn current_project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.project_id.is_none()
    }

    /// Scope of the enclosing request, or empty outside of one.
    pub fn current() -> AccessScope {
        CURRENT_SCOPE.try_with(|scope| *scope).unwrap_or_default()
    }

    /// Run `fut` with this scope installed.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_SCOPE.scope(self, fut).await
    }
}

//! PostgreSQL Collaborator Implementations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kernel::id::{ProjectId, UserId};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    identity::Identity,
    role::{Permission, Role},
};
use crate::domain::repository::{MembershipOracle, UserDirectory};
use crate::domain::value_object::{email::Email, user_status::UserStatus};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed user directory and membership oracle
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_roles(&self, user_id: &UserId) -> AuthResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                r.name AS role_name,
                p.name AS permission_name
            FROM user_roles ur
            JOIN roles r ON r.role_id = ur.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
            LEFT JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(RolePermissionRow::into_roles(rows))
    }

    async fn with_roles(&self, row: Option<IdentityRow>) -> AuthResult<Option<Identity>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let user_id = UserId::from_uuid(row.user_id);
        let roles = self.load_roles(&user_id).await?;
        row.into_identity(roles).map(Some)
    }
}

// ============================================================================
// User Directory Implementation
// ============================================================================

const IDENTITY_COLUMNS: &str = r#"
    user_id,
    email,
    password_hash,
    status,
    email_verified,
    verification_token,
    password_reset_token,
    password_reset_expires_at,
    last_login_at,
    created_at,
    updated_at
"#;

impl UserDirectory for PgDirectory {
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_role(&self, name: &str) -> AuthResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                r.name AS role_name,
                p.name AS permission_name
            FROM roles r
            LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
            LEFT JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE r.name = $1
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(RolePermissionRow::into_roles(rows).into_iter().next())
    }

    async fn create(&self, identity: &Identity) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email,
                password_hash,
                status,
                email_verified,
                verification_token,
                password_reset_token,
                password_reset_expires_at,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(identity.user_id.as_uuid())
        .bind(identity.email.as_str())
        .bind(identity.password_hash.as_phc_string())
        .bind(identity.status.code())
        .bind(identity.email_verified)
        .bind(identity.verification_token.as_deref())
        .bind(identity.password_reset_token.as_deref())
        .bind(identity.password_reset_expires_at)
        .bind(identity.last_login_at)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(AuthError::EmailAlreadyInUse);
            }
            other => {
                other?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, role_id FROM roles WHERE name = ANY($2)
            "#,
        )
        .bind(identity.user_id.as_uuid())
        .bind(identity.role_names())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn update(&self, identity: &Identity) -> AuthResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                password_hash = $3,
                status = $4,
                email_verified = $5,
                verification_token = $6,
                password_reset_token = $7,
                password_reset_expires_at = $8,
                last_login_at = $9,
                updated_at = $10
            WHERE user_id = $1
            "#,
        )
        .bind(identity.user_id.as_uuid())
        .bind(identity.email.as_str())
        .bind(identity.password_hash.as_phc_string())
        .bind(identity.status.code())
        .bind(identity.email_verified)
        .bind(identity.verification_token.as_deref())
        .bind(identity.password_reset_token.as_deref())
        .bind(identity.password_reset_expires_at)
        .bind(identity.last_login_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AuthError::UserNotFound);
        }

        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> AuthResult<()> {
        // user_roles rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Membership Oracle Implementation
// ============================================================================

impl MembershipOracle for PgDirectory {
    async fn has_access(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool> {
        let has_access = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM projects p
                WHERE p.project_id = $1
                  AND (
                    p.owner_id = $2
                    OR EXISTS(
                        SELECT 1 FROM project_members m
                        WHERE m.project_id = p.project_id AND m.user_id = $2
                    )
                  )
            )
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(has_access)
    }

    async fn is_owner(&self, user_id: &UserId, project_id: &ProjectId) -> AuthResult<bool> {
        let is_owner = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = $1 AND owner_id = $2)",
        )
        .bind(project_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(is_owner)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct IdentityRow {
    user_id: Uuid,
    email: String,
    password_hash: String,
    status: String,
    email_verified: bool,
    verification_token: Option<String>,
    password_reset_token: Option<String>,
    password_reset_expires_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self, roles: Vec<Role>) -> AuthResult<Identity> {
        let status = UserStatus::from_code(&self.status)
            .ok_or_else(|| AuthError::Internal(format!("Invalid user status: {}", self.status)))?;

        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Identity {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            password_hash,
            status,
            email_verified: self.email_verified,
            roles,
            verification_token: self.verification_token,
            password_reset_token: self.password_reset_token,
            password_reset_expires_at: self.password_reset_expires_at,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RolePermissionRow {
    role_name: String,
    permission_name: Option<String>,
}

impl RolePermissionRow {
    /// One row per (role, permission); roles without permissions come back
    /// with a NULL permission.
    fn into_roles(rows: Vec<Self>) -> Vec<Role> {
        let mut roles: BTreeMap<String, Role> = BTreeMap::new();
        for row in rows {
            let role = roles
                .entry(row.role_name.clone())
                .or_insert_with(|| Role::new(row.role_name));
            if let Some(permission) = row.permission_name {
                role.permissions.insert(Permission::new(permission));
            }
        }
        roles.into_values().collect()
    }
}

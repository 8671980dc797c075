/// User permission grants
///
/// A `UserPermission` grants one catalog permission to one user. Grants are
/// revoked rather than deleted. At most one non-revoked grant exists per
/// (user, permission) pair, enforced by a partial unique index.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     permission_id UUID NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
///     revoked BOOLEAN NOT NULL DEFAULT FALSE,
///     revoked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX user_permissions_active_unique
///     ON user_permissions (user_id, permission_id) WHERE revoked = FALSE;
/// ```
///
/// Listing and lookup functions take an `owner` filter: `Some(user_id)`
/// restricts results to grants held by that user, `None` is unrestricted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::Pagination;

const DETAIL_SELECT: &str = r#"
    SELECT up.id, up.user_id, up.permission_id, p.name AS permission_name,
           s.name AS scope_name, up.revoked, up.revoked_at, up.created_at
    FROM user_permissions up
    JOIN permissions p ON p.id = up.permission_id
    LEFT JOIN scope_user_permissions sup ON sup.user_permission_id = up.id
    LEFT JOIN scopes s ON s.id = sup.scope_id
"#;

/// Grant row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPermission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserPermission {
    /// A grant is active while it has not been revoked
    pub fn is_active(&self) -> bool {
        !self.revoked
    }
}

/// Grant joined with its permission name and scope, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPermissionDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub permission_name: String,
    pub scope_name: Option<String>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserPermission {
    pub user_id: Uuid,
    pub permission_id: Uuid,

    /// Scope to bind the grant to, if any
    pub scope_id: Option<Uuid>,
}

impl UserPermission {
    /// Creates a grant and, when given, binds it to a scope
    ///
    /// Both inserts run in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if an active grant for the
    /// same (user, permission) pair already exists.
    pub async fn create(pool: &PgPool, data: CreateUserPermission) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let grant = Self::create_in(&mut tx, data).await?;
        tx.commit().await?;

        Ok(grant)
    }

    /// [`UserPermission::create`] on a caller-owned connection or transaction
    pub async fn create_in(
        conn: &mut PgConnection,
        data: CreateUserPermission,
    ) -> Result<Self, sqlx::Error> {
        let grant = sqlx::query_as::<_, UserPermission>(
            r#"
            INSERT INTO user_permissions (user_id, permission_id)
            VALUES ($1, $2)
            RETURNING id, user_id, permission_id, revoked, revoked_at, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.permission_id)
        .fetch_one(&mut *conn)
        .await?;

        if let Some(scope_id) = data.scope_id {
            sqlx::query(
                "INSERT INTO scope_user_permissions (scope_id, user_permission_id) VALUES ($1, $2)",
            )
            .bind(scope_id)
            .bind(grant.id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(grant)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserPermission>(
            r#"
            SELECT id, user_id, permission_id, revoked, revoked_at, created_at
            FROM user_permissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds the active grant joining a user and a permission
    pub async fn find_active(
        pool: &PgPool,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserPermission>(
            r#"
            SELECT id, user_id, permission_id, revoked, revoked_at, created_at
            FROM user_permissions
            WHERE user_id = $1 AND permission_id = $2 AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .bind(permission_id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a grant with its permission and scope names
    pub async fn find_detail(
        pool: &PgPool,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Option<UserPermissionDetail>, sqlx::Error> {
        let query = format!(
            "{} WHERE up.id = $1 AND ($2::uuid IS NULL OR up.user_id = $2)",
            DETAIL_SELECT
        );

        sqlx::query_as::<_, UserPermissionDetail>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }

    /// Lists grants, newest first
    pub async fn list_details(
        pool: &PgPool,
        owner: Option<Uuid>,
        page: Pagination,
    ) -> Result<Vec<UserPermissionDetail>, sqlx::Error> {
        let query = format!(
            "{} WHERE ($1::uuid IS NULL OR up.user_id = $1) ORDER BY up.created_at DESC LIMIT $2 OFFSET $3",
            DETAIL_SELECT
        );

        sqlx::query_as::<_, UserPermissionDetail>(&query)
            .bind(owner)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Counts grants under the same filter as [`UserPermission::list_details`]
    pub async fn count(pool: &PgPool, owner: Option<Uuid>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_permissions WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(owner)
        .fetch_one(pool)
        .await
    }

    /// Sets or clears the revoked flag
    ///
    /// Clearing it fails with a unique violation if another active grant for
    /// the same pair exists.
    pub async fn set_revoked(pool: &PgPool, id: Uuid, revoked: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_permissions
            SET revoked = $2,
                revoked_at = CASE WHEN $2 THEN NOW() ELSE NULL END
            WHERE id = $1 AND revoked <> $2
            "#,
        )
        .bind(id)
        .bind(revoked)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes a grant; returns false if it was already revoked or missing
    pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        Self::set_revoked(pool, id, true).await
    }
}

/// Scope model and scope-to-grant bindings
///
/// A scope is a named policy tier. Each grant is bound to at most one scope
/// through `scope_user_permissions`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE scopes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE scope_user_permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     scope_id UUID NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
///     user_permission_id UUID NOT NULL UNIQUE REFERENCES user_permissions(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Scope restricting a grant to the holder's own rows
pub const PERSONAL: &str = "personal";

/// Scope granting unrestricted access
pub const SUPER_ADMIN: &str = "super-admin";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Scope {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Scope {
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Scope>(
            "SELECT id, name, description, created_at FROM scopes WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Name of the scope bound to a grant, if any
    pub async fn name_for_grant(
        pool: &PgPool,
        user_permission_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT s.name
            FROM scope_user_permissions sup
            JOIN scopes s ON s.id = sup.scope_id
            WHERE sup.user_permission_id = $1
            "#,
        )
        .bind(user_permission_id)
        .fetch_optional(pool)
        .await
    }

    /// Binds a grant to this scope, replacing any previous binding
    pub async fn bind_grant(
        pool: &PgPool,
        scope_id: Uuid,
        user_permission_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO scope_user_permissions (scope_id, user_permission_id)
            VALUES ($1, $2)
            ON CONFLICT (user_permission_id) DO UPDATE SET scope_id = EXCLUDED.scope_id
            "#,
        )
        .bind(scope_id)
        .bind(user_permission_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}

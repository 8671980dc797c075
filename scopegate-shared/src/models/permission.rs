/// Permission catalog model
///
/// A permission is a named capability (e.g. `read-post`). Users hold
/// permissions through grants (see [`super::user_permission`]). Catalog rows
/// are soft-deleted so that historical grants keep a valid reference.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// CREATE UNIQUE INDEX permissions_name_active_unique
///     ON permissions (name) WHERE deleted_at IS NULL;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Pagination;

const PERMISSION_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at";

/// Permissions checked by the API's handlers
///
/// The wire/database form is kebab-case, e.g. `PermissionName::ReadPost`
/// is stored as `read-post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionName {
    CreatePost,
    ReadPost,
    UpdatePost,
    DeletePost,
    CreatePermission,
    ReadPermission,
    UpdatePermission,
    DeletePermission,
    CreateUserPermission,
    ReadUserPermission,
    UpdateUserPermission,
    DeleteUserPermission,
}

impl PermissionName {
    /// Every permission the API knows about
    pub const ALL: [PermissionName; 12] = [
        PermissionName::CreatePost,
        PermissionName::ReadPost,
        PermissionName::UpdatePost,
        PermissionName::DeletePost,
        PermissionName::CreatePermission,
        PermissionName::ReadPermission,
        PermissionName::UpdatePermission,
        PermissionName::DeletePermission,
        PermissionName::CreateUserPermission,
        PermissionName::ReadUserPermission,
        PermissionName::UpdateUserPermission,
        PermissionName::DeleteUserPermission,
    ];

    /// Permissions granted to every newly registered user (personal scope)
    pub const DEFAULT_FOR_NEW_USERS: [PermissionName; 4] = [
        PermissionName::CreatePost,
        PermissionName::ReadPost,
        PermissionName::UpdatePost,
        PermissionName::DeletePost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionName::CreatePost => "create-post",
            PermissionName::ReadPost => "read-post",
            PermissionName::UpdatePost => "update-post",
            PermissionName::DeletePost => "delete-post",
            PermissionName::CreatePermission => "create-permission",
            PermissionName::ReadPermission => "read-permission",
            PermissionName::UpdatePermission => "update-permission",
            PermissionName::DeletePermission => "delete-permission",
            PermissionName::CreateUserPermission => "create-user-permission",
            PermissionName::ReadUserPermission => "read-user-permission",
            PermissionName::UpdateUserPermission => "update-user-permission",
            PermissionName::DeleteUserPermission => "delete-user-permission",
        }
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

/// Permission catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a permission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a permission; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Permission {
    pub async fn create(pool: &PgPool, data: CreatePermission) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO permissions (name, description) VALUES ($1, $2) RETURNING {}",
            PERMISSION_COLUMNS
        );

        sqlx::query_as::<_, Permission>(&query)
            .bind(data.name)
            .bind(data.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM permissions WHERE id = $1 AND deleted_at IS NULL",
            PERMISSION_COLUMNS
        );

        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a live catalog entry by its name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM permissions WHERE name = $1 AND deleted_at IS NULL",
            PERMISSION_COLUMNS
        );

        sqlx::query_as::<_, Permission>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Lists live catalog entries ordered by name
    pub async fn list(pool: &PgPool, page: Pagination) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM permissions WHERE deleted_at IS NULL ORDER BY name LIMIT $1 OFFSET $2",
            PERMISSION_COLUMNS
        );

        sqlx::query_as::<_, Permission>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await
    }

    /// Updates a live catalog entry
    ///
    /// Returns `None` if no live entry has this ID.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePermission,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE permissions
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PERMISSION_COLUMNS
        );

        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .fetch_optional(pool)
            .await
    }

    /// Soft-deletes a catalog entry
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE permissions SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts active (non-revoked) grants referencing this permission
    pub async fn active_grant_count(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_permissions WHERE permission_id = $1 AND revoked = FALSE",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_name_round_trip_str() {
        for name in PermissionName::ALL {
            assert_eq!(name.as_str().parse::<PermissionName>().unwrap(), name);
        }
    }

    #[test]
    fn test_permission_name_serde_matches_as_str() {
        let json = serde_json::to_value(PermissionName::CreateUserPermission).unwrap();
        assert_eq!(json, "create-user-permission");
    }

    #[test]
    fn test_unknown_permission_name() {
        assert!("drop-database".parse::<PermissionName>().is_err());
    }

    #[test]
    fn test_defaults_are_post_permissions() {
        assert!(PermissionName::DEFAULT_FOR_NEW_USERS
            .iter()
            .all(|p| p.as_str().ends_with("-post")));
    }
}

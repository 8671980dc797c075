/// Permission resolution
///
/// Decides whether a user currently holds a named permission. Every step
/// fails closed: a missing or soft-deleted user, an unknown permission or a
/// revoked grant all yield an invalid check, never an error.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    permission::{Permission, PermissionName},
    user::User,
    user_permission::UserPermission,
};

/// Outcome of a permission lookup
///
/// `permission` carries the ID of the matching grant (the `user_permissions`
/// row) when `valid` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub valid: bool,
    pub permission: Option<Uuid>,
}

impl PermissionCheck {
    pub fn denied() -> Self {
        Self {
            valid: false,
            permission: None,
        }
    }

    pub fn granted(grant_id: Uuid) -> Self {
        Self {
            valid: true,
            permission: Some(grant_id),
        }
    }

    /// Grant ID if the check passed
    pub fn grant_id(&self) -> Option<Uuid> {
        if self.valid {
            self.permission
        } else {
            None
        }
    }
}

/// Resolves permission names against a user's active grants
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    pool: &'a PgPool,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Checks that `user_id` holds an active grant for `name`
    ///
    /// # Errors
    ///
    /// Only database failures are errors; every "no" is a denied check.
    pub async fn resolve(
        &self,
        name: PermissionName,
        user_id: Uuid,
    ) -> Result<PermissionCheck, sqlx::Error> {
        if User::find_by_id(self.pool, user_id).await?.is_none() {
            tracing::debug!(user_id = %user_id, "permission check on unknown user");
            return Ok(PermissionCheck::denied());
        }

        let Some(permission) = Permission::find_by_name(self.pool, name.as_str()).await? else {
            tracing::warn!(permission = %name, "permission missing from catalog");
            return Ok(PermissionCheck::denied());
        };

        let grant = UserPermission::find_active(self.pool, user_id, permission.id).await?;

        Ok(match grant {
            Some(grant) if grant.is_active() => PermissionCheck::granted(grant.id),
            _ => PermissionCheck::denied(),
        })
    }
}

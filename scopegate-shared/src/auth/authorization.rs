/// Authorization helpers
///
/// Combines the permission and scope resolvers into the single check every
/// resource handler runs before touching data.
///
/// # Permission Model
///
/// 1. **Grant**: the user must hold an active grant for the named permission
/// 2. **Scope**: the grant's scope decides whether the handler sees only the
///    caller's rows or all of them
///
/// # Example
///
/// ```no_run
/// use scopegate_shared::auth::authorization::authorize;
/// use scopegate_shared::models::permission::PermissionName;
/// use scopegate_shared::models::post::Post;
/// use scopegate_shared::models::Pagination;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let grant = authorize(&pool, user_id, PermissionName::ReadPost).await?;
/// let posts = Post::list(&pool, grant.access.owner(), None, Pagination::default()).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::permission::PermissionResolver;
use super::scope::{AccessScope, ScopeResolver};
use crate::models::permission::PermissionName;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No active grant for the permission
    #[error("Missing permission: {0}")]
    MissingPermission(PermissionName),

    /// Grant exists but its scope does not reach the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// A permission the caller was found to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// `user_permissions` row backing the decision
    pub grant_id: Uuid,
    pub permission: PermissionName,
    pub access: AccessScope,
}

impl Grant {
    /// Fails unless the grant reaches every row
    pub fn require_unrestricted(&self) -> Result<(), AuthzError> {
        if !self.access.is_unrestricted() {
            return Err(AuthzError::NotAuthorized);
        }

        Ok(())
    }

    /// Fails unless a row owned by `owner_id` is within reach
    pub fn require_reach(&self, owner_id: Uuid) -> Result<(), AuthzError> {
        if !self.access.permits(owner_id) {
            return Err(AuthzError::NotAuthorized);
        }

        Ok(())
    }
}

/// Resolves `permission` for `user_id` and the scope of the matching grant
///
/// # Errors
///
/// - `AuthzError::MissingPermission` if the user holds no active grant
/// - `AuthzError::DatabaseError` on query failure
pub async fn authorize(
    pool: &PgPool,
    user_id: Uuid,
    permission: PermissionName,
) -> Result<Grant, AuthzError> {
    let check = PermissionResolver::new(pool)
        .resolve(permission, user_id)
        .await?;

    let grant_id = check
        .grant_id()
        .ok_or(AuthzError::MissingPermission(permission))?;

    let access = ScopeResolver::new(pool).access(grant_id, user_id).await?;

    tracing::debug!(
        user_id = %user_id,
        permission = %permission,
        unrestricted = access.is_unrestricted(),
        "authorized"
    );

    Ok(Grant {
        grant_id,
        permission,
        access,
    })
}

/// Scope resolution
///
/// A grant's scope decides how far it reaches. The `personal` scope limits a
/// grant to rows owned by the holder; any other named scope (such as
/// `super-admin`) lifts the restriction. A grant with no scope binding is
/// treated as `personal`.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::scope::{Scope, PERSONAL};

/// Effective reach of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum AccessScope {
    /// Only rows owned by this user
    Own(Uuid),

    /// Every row
    Unrestricted,
}

impl AccessScope {
    /// Maps a scope name to the access it grants `user_id`
    pub fn resolve(scope: Option<&str>, user_id: Uuid) -> Self {
        match scope {
            Some(PERSONAL) | None => AccessScope::Own(user_id),
            Some(_) => AccessScope::Unrestricted,
        }
    }

    /// Owner filter for model queries; `None` means unfiltered
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            AccessScope::Own(user_id) => Some(*user_id),
            AccessScope::Unrestricted => None,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AccessScope::Unrestricted)
    }

    /// Whether a row owned by `owner_id` is reachable
    pub fn permits(&self, owner_id: Uuid) -> bool {
        match self {
            AccessScope::Own(user_id) => *user_id == owner_id,
            AccessScope::Unrestricted => true,
        }
    }
}

/// Looks up the scope bound to a grant
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'a> {
    pool: &'a PgPool,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Name of the scope bound to `grant_id`, if any
    pub async fn resolve(&self, grant_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        Scope::name_for_grant(self.pool, grant_id).await
    }

    /// Resolves the grant's scope straight to an [`AccessScope`]
    pub async fn access(&self, grant_id: Uuid, user_id: Uuid) -> Result<AccessScope, sqlx::Error> {
        let name = self.resolve(grant_id).await?;
        Ok(AccessScope::resolve(name.as_deref(), user_id))
    }
}

/// Login sessions
///
/// A session backs one refresh token and is referenced by the `sid` claim of
/// access tokens. A session is active while it is neither revoked nor
/// expired; the login flow allows at most one active session per user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     refresh_token_hash VARCHAR(64) NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     revoked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, revoked_at, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,

    /// SHA-256 hex of the refresh token
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a session
///
/// The ID is chosen by the caller so it can be embedded in the tokens before
/// the row is written.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }

    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, Session>(&query)
            .bind(data.id)
            .bind(data.user_id)
            .bind(data.refresh_token_hash)
            .bind(data.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Finds a session if it is still active
    pub async fn find_active(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM sessions
            WHERE id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user currently holds an active session
    pub async fn has_active(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Revokes one session; returns false if it was not active
    pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every open session of a user, returning how many were revoked
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

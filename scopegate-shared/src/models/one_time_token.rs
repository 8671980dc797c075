/// Email verification and password reset tokens
///
/// Both kinds share one shape and live in separate tables. Only the SHA-256
/// hash of a token is stored (see [`crate::auth::tokens`]). A token is valid
/// while it is unused and unexpired; consuming it sets `used_at`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_verification_tokens (   -- and password_reset_tokens
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     used_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// What a one-time token is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    fn table(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification_tokens",
            TokenPurpose::PasswordReset => "password_reset_tokens",
        }
    }

    /// How long a freshly issued token stays valid
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::EmailVerification => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OneTimeToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && self.expires_at > Utc::now()
    }

    /// Stores a new token hash for a user
    ///
    /// Outstanding tokens of the same purpose are invalidated first, so only
    /// the most recently issued link works.
    pub async fn issue(
        pool: &PgPool,
        purpose: TokenPurpose,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let token = Self::issue_in(&mut tx, purpose, user_id, token_hash).await?;
        tx.commit().await?;

        Ok(token)
    }

    /// [`OneTimeToken::issue`] on a caller-owned connection or transaction
    pub async fn issue_in(
        conn: &mut PgConnection,
        purpose: TokenPurpose,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let invalidate = format!(
            "UPDATE {} SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
            purpose.table()
        );
        sqlx::query(&invalidate)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        let insert = format!(
            r#"
            INSERT INTO {} (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, used_at, created_at
            "#,
            purpose.table()
        );

        sqlx::query_as::<_, OneTimeToken>(&insert)
            .bind(user_id)
            .bind(token_hash)
            .bind(Utc::now() + purpose.lifetime())
            .fetch_one(&mut *conn)
            .await
    }

    /// Finds an unused, unexpired token by hash
    pub async fn find_valid(
        pool: &PgPool,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT id, user_id, token_hash, expires_at, used_at, created_at
            FROM {}
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            "#,
            purpose.table()
        );

        sqlx::query_as::<_, OneTimeToken>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Marks a token as used
    ///
    /// Returns false if it had already been consumed, which lets two racing
    /// requests agree on a single winner.
    pub async fn consume(pool: &PgPool, purpose: TokenPurpose, id: Uuid) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
            purpose.table()
        );

        let result = sqlx::query(&query).bind(id).execute(pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_tables_differ() {
        assert_ne!(
            TokenPurpose::EmailVerification.table(),
            TokenPurpose::PasswordReset.table()
        );
    }

    #[test]
    fn test_reset_tokens_are_short_lived() {
        assert!(TokenPurpose::PasswordReset.lifetime() < TokenPurpose::EmailVerification.lifetime());
    }

    #[test]
    fn test_is_valid() {
        let mut token = OneTimeToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "h".to_string(),
            expires_at: Utc::now() + Duration::minutes(5),
            used_at: None,
            created_at: Utc::now(),
        };
        assert!(token.is_valid());

        token.used_at = Some(Utc::now());
        assert!(!token.is_valid());

        token.used_at = None;
        token.expires_at = Utc::now() - Duration::minutes(5);
        assert!(!token.is_valid());
    }
}

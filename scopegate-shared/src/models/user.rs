/// User model and database operations
///
/// Users are soft-deleted: a non-null `deleted_at` hides the row from every
/// lookup in this module.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use scopegate_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "User@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: None,
/// }).await?;
///
/// // Emails are stored lowercase
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::one_time_token::{OneTimeToken, TokenPurpose};
use super::user_permission::{CreateUserPermission, UserPermission};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, email_verified, created_at, updated_at, deleted_at";

/// User model representing a user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, stored lowercase
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Set once the email verification flow completes
    pub email_verified: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (lowercased on insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,
}

/// A permission granted at registration, bound to a scope when given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartingGrant {
    pub permission_id: Uuid,
    pub scope_id: Option<Uuid>,
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Whether the account can authenticate at all
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Creates a new, unverified user
    ///
    /// # Errors
    ///
    /// Returns a database error on unique violation of `email`.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::create_in(&mut conn, data).await
    }

    /// [`User::create`] on a caller-owned connection or transaction
    pub async fn create_in(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.name)
            .fetch_one(&mut *conn)
            .await
    }

    /// Creates a user together with its starting grants and a verification
    /// token
    ///
    /// Every row is written in one transaction: if any insert fails, no
    /// user is left behind to block the email.
    ///
    /// # Errors
    ///
    /// Unique violation on `email`, or a foreign-key violation for an unknown
    /// permission or scope.
    pub async fn register(
        pool: &PgPool,
        data: CreateUser,
        grants: &[StartingGrant],
        verification_token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = Self::create_in(&mut tx, data).await?;

        for grant in grants {
            UserPermission::create_in(
                &mut tx,
                CreateUserPermission {
                    user_id: user.id,
                    permission_id: grant.permission_id,
                    scope_id: grant.scope_id,
                },
            )
            .await?;
        }

        OneTimeToken::issue_in(
            &mut tx,
            TokenPurpose::EmailVerification,
            user.id,
            verification_token_hash,
        )
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Finds an active (not soft-deleted) user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an active (not soft-deleted) user by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Checks whether an email is taken, including by soft-deleted accounts
    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(normalize_email(email))
            .fetch_one(pool)
            .await
    }

    /// Marks the user's email as verified
    pub async fn mark_verified(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deletes a user
    ///
    /// Returns false if the user does not exist or is already deleted.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Permanently deletes a user (test teardown only)
    pub async fn purge(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: Some("Test User".to_string()),
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "test@example.com");
    }

    #[test]
    fn test_is_active() {
        let mut user = sample_user();
        assert!(user.is_active());

        user.deleted_at = Some(Utc::now());
        assert!(!user.is_active());
    }
}

/// Post model and database operations
///
/// Posts are owned by a user (`user_id`) and soft-deleted. Every query takes
/// an `owner` filter: `Some(user_id)` limits the query to that user's posts
/// (personal scope), `None` leaves it unrestricted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE posts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     content TEXT NOT NULL,
///     status VARCHAR(20) NOT NULL DEFAULT 'draft',
///     visibility VARCHAR(20) NOT NULL DEFAULT 'public',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use super::Pagination;

const POST_COLUMNS: &str =
    "id, user_id, title, content, status, visibility, created_at, updated_at, deleted_at";

/// Publication status of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            _ => Err(format!("Invalid post status: {}", s)),
        }
    }
}

/// Who may see a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostVisibility {
    Public,
    Private,
}

impl PostVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostVisibility::Public => "public",
            PostVisibility::Private => "private",
        }
    }
}

impl FromStr for PostVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(PostVisibility::Public),
            "private" => Ok(PostVisibility::Private),
            _ => Err(format!("Invalid post visibility: {}", s)),
        }
    }
}

/// Post row
///
/// `status` and `visibility` are stored as strings; use [`Post::status`] and
/// [`Post::visibility`] for the typed values.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    pub title: String,
    pub content: String,
    pub status: String,
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a post
#[derive(Debug, Clone)]
pub struct CreatePost {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub visibility: PostVisibility,
}

/// Input for updating a post; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub visibility: Option<PostVisibility>,
}

impl Post {
    pub fn status(&self) -> Result<PostStatus, String> {
        self.status.parse()
    }

    pub fn visibility(&self) -> Result<PostVisibility, String> {
        self.visibility.parse()
    }

    pub async fn create(pool: &PgPool, data: CreatePost) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO posts (user_id, title, content, status, visibility)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(data.user_id)
            .bind(data.title)
            .bind(data.content)
            .bind(data.status.as_str())
            .bind(data.visibility.as_str())
            .fetch_one(pool)
            .await
    }

    /// Finds a live post, optionally restricted to an owner
    pub async fn find(
        pool: &PgPool,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM posts
            WHERE id = $1 AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR user_id = $2)
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }

    /// Lists live posts, newest first
    pub async fn list(
        pool: &PgPool,
        owner: Option<Uuid>,
        status: Option<PostStatus>,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM posts
            WHERE deleted_at IS NULL
              AND ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(owner)
            .bind(status.map(|s| s.as_str()))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Counts live posts under the same filters as [`Post::list`]
    pub async fn count(
        pool: &PgPool,
        owner: Option<Uuid>,
        status: Option<PostStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts
            WHERE deleted_at IS NULL
              AND ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(owner)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(pool)
        .await
    }

    /// Updates a live post
    ///
    /// Returns `None` if the post is missing, deleted, or outside `owner`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner: Option<Uuid>,
        data: UpdatePost,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE posts
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                status = COALESCE($5, status),
                visibility = COALESCE($6, visibility),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(owner)
            .bind(data.title)
            .bind(data.content)
            .bind(data.status.map(|s| s.as_str()))
            .bind(data.visibility.map(|v| v.as_str()))
            .fetch_optional(pool)
            .await
    }

    /// Soft-deletes a post
    pub async fn soft_delete(
        pool: &PgPool,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("draft".parse::<PostStatus>().unwrap(), PostStatus::Draft);
        assert_eq!("archived".parse::<PostStatus>().unwrap(), PostStatus::Archived);
        assert!("deleted".parse::<PostStatus>().is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!(
            "private".parse::<PostVisibility>().unwrap(),
            PostVisibility::Private
        );
        assert!("secret".parse::<PostVisibility>().is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let post = Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Hello".to_string(),
            content: "World".to_string(),
            status: "published".to_string(),
            visibility: "public".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        assert_eq!(post.status().unwrap(), PostStatus::Published);
        assert_eq!(post.visibility().unwrap(), PostVisibility::Public);

        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("deleted_at").is_none());
    }
}

/// Database models for Scopegate
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts (soft-deletable)
/// - `permission`: Permission catalog
/// - `user_permission`: Grants of permissions to users
/// - `scope`: Named policy tiers and their binding to grants
/// - `post`: Owned posts (soft-deletable)
/// - `session`: Refresh-token sessions
/// - `one_time_token`: Email verification and password reset tokens
///
/// # Example
///
/// ```no_run
/// use scopegate_shared::models::user::{User, CreateUser};
/// use scopegate_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jane Doe".to_string()),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod one_time_token;
pub mod permission;
pub mod post;
pub mod scope;
pub mod session;
pub mod user;
pub mod user_permission;

use serde::Deserialize;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Largest page number; keeps `offset()` within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Page/limit pagination as accepted on list endpoints
///
/// Pages are 1-based. Out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Creates a pagination for the given page and limit
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Effective 1-based page number, clamped to `1..=MAX_PAGE`
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Effective page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

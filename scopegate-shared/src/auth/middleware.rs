/// Bearer authentication
///
/// Extracts the access token from `Authorization: Bearer <token>`, validates
/// it, and checks that the session named by its `sid` claim is still active.
/// A logged-out session therefore invalidates every access token issued for
/// it, even before the token expires.
///
/// # Request Extensions
///
/// The API's auth layer inserts the resulting [`AuthContext`] into request
/// extensions for handlers to extract.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use scopegate_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, Session: {}", auth.user_id, auth.session_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::session::Session;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid, session_id: Uuid) -> Self {
        Self {
            user_id,
            session_id,
        }
    }
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its session was revoked or expired
    #[error("Session is no longer active")]
    SessionInactive,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::WrongType { expected } => {
                AuthError::InvalidToken(format!("Expected {} token", expected))
            }
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        }
    }
}

/// Pulls the bearer token out of request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `MissingCredentials` / `InvalidFormat` for a missing or malformed header
/// - `InvalidToken` if the JWT fails validation
/// - `SessionInactive` if the session was revoked, expired, or belongs to
///   another user
pub async fn authenticate_bearer(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    let session = Session::find_active(pool, claims.sid)
        .await?
        .ok_or(AuthError::SessionInactive)?;

    if session.user_id != claims.sub {
        tracing::warn!(user_id = %claims.sub, session_id = %claims.sid, "session/user mismatch");
        return Err(AuthError::SessionInactive);
    }

    Ok(AuthContext::new(claims.sub, claims.sid))
}

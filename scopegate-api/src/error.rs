/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; errors render as an error
/// envelope:
///
/// ```json
/// {
///   "status": "error",
///   "message": "Post not found",
///   "data": { "code": "not_found" }
/// }
/// ```
///
/// Validation failures add `data.details`, a list of `{field, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scopegate_shared::{
    auth::{
        authorization::AuthzError,
        jwt::JwtError,
        middleware::AuthError,
        password::PasswordError,
        tokens::TokenError,
    },
    crypto::CipherError,
    lock::LockError,
    mail::MailError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

use crate::envelope::Envelope;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email, busy lock
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// `data` of an error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorData {
    /// Machine-readable code (e.g., "bad_request", "unauthorized")
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Canonical client-facing messages
///
/// Handlers return these instead of ad hoc strings so the same condition
/// always produces the same status and wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMessage {
    InvalidCredentials,
    EmailNotVerified,
    AlreadyLoggedIn,
    EmailTaken,
    InvalidToken,
    SessionInactive,
    NotAuthorized,
    UserNotFound,
    PostNotFound,
    PermissionNotFound,
    PermissionExists,
    PermissionInUse,
    UserPermissionNotFound,
    DuplicateGrant,
    ScopeNotFound,
    ResourceBusy,
}

impl ErrorMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMessage::InvalidCredentials => "Invalid email or password",
            ErrorMessage::EmailNotVerified => "Email not verified",
            ErrorMessage::AlreadyLoggedIn => "User already logged in",
            ErrorMessage::EmailTaken => "Email already registered",
            ErrorMessage::InvalidToken => "Invalid or expired token",
            ErrorMessage::SessionInactive => "Session is no longer active",
            ErrorMessage::NotAuthorized => "Not authorized",
            ErrorMessage::UserNotFound => "User not found",
            ErrorMessage::PostNotFound => "Post not found",
            ErrorMessage::PermissionNotFound => "Permission not found",
            ErrorMessage::PermissionExists => "Permission already exists",
            ErrorMessage::PermissionInUse => "Permission is still granted to users",
            ErrorMessage::UserPermissionNotFound => "User permission not found",
            ErrorMessage::DuplicateGrant => "User already has this permission",
            ErrorMessage::ScopeNotFound => "Scope not found",
            ErrorMessage::ResourceBusy => "Resource is busy, try again",
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorMessage> for ApiError {
    fn from(msg: ErrorMessage) -> Self {
        let text = msg.as_str().to_string();
        match msg {
            ErrorMessage::InvalidCredentials | ErrorMessage::SessionInactive => {
                ApiError::Unauthorized(text)
            }
            ErrorMessage::EmailNotVerified | ErrorMessage::NotAuthorized => {
                ApiError::Forbidden(text)
            }
            ErrorMessage::AlreadyLoggedIn
            | ErrorMessage::EmailTaken
            | ErrorMessage::PermissionExists
            | ErrorMessage::PermissionInUse
            | ErrorMessage::DuplicateGrant
            | ErrorMessage::ResourceBusy => ApiError::Conflict(text),
            ErrorMessage::InvalidToken => ApiError::BadRequest(text),
            ErrorMessage::UserNotFound
            | ErrorMessage::PostNotFound
            | ErrorMessage::PermissionNotFound
            | ErrorMessage::UserPermissionNotFound
            | ErrorMessage::ScopeNotFound => ApiError::NotFound(text),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = Envelope::error(message, Some(ErrorData { code, details }));

        (status, Json(body)).into_response()
    }
}

/// Convert validator errors to API errors
impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(errors)
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        Some(c) if c.contains("email") => ErrorMessage::EmailTaken.into(),
                        Some("user_permissions_active_unique") => {
                            ErrorMessage::DuplicateGrant.into()
                        }
                        Some("permissions_name_active_unique") => {
                            ErrorMessage::PermissionExists.into()
                        }
                        Some(c) => ApiError::Conflict(format!("Constraint violation: {}", c)),
                        None => ApiError::Conflict("Duplicate resource".to_string()),
                    };
                }

                if db_err.is_foreign_key_violation() {
                    return ApiError::BadRequest("Referenced resource does not exist".to_string());
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is busy, try again".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert bearer auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::SessionInactive => ErrorMessage::SessionInactive.into(),
            AuthError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingPermission(permission) => {
                tracing::debug!(permission = %permission, "permission denied");
                ErrorMessage::NotAuthorized.into()
            }
            AuthzError::NotAuthorized => ErrorMessage::NotAuthorized.into(),
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            JwtError::WrongType { expected } => {
                ApiError::Unauthorized(format!("Expected {} token", expected))
            }
            JwtError::ValidationError(_) => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Convert one-time token errors to API errors
impl From<TokenError> for ApiError {
    fn from(_: TokenError) -> Self {
        ErrorMessage::InvalidToken.into()
    }
}

/// Convert lock errors to API errors
impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Busy { .. } => ErrorMessage::ResourceBusy.into(),
            LockError::Backend(msg) => {
                tracing::error!("Lock backend error: {}", msg);
                ApiError::ServiceUnavailable("Lock service unavailable".to_string())
            }
        }
    }
}

/// Convert payload encryption errors to API errors
impl From<CipherError> for ApiError {
    fn from(err: CipherError) -> Self {
        ApiError::InternalError(format!("Payload encryption failed: {}", err))
    }
}

/// Convert mail errors to API errors
impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Mail delivery failed: {}", err);
        ApiError::ServiceUnavailable("Mail delivery unavailable".to_string())
    }
}

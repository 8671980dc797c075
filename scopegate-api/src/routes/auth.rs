/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /register` - Register a new (unverified) user
/// - `POST /verify-email` - Redeem an email verification token
/// - `POST /resend-verification` - Mail a fresh verification token
/// - `POST /login` - Open a session and get tokens
/// - `POST /logout` - Close the caller's session (auth)
/// - `POST /refresh` - Exchange a refresh token for a new access token
/// - `POST /forgot-password` - Mail a password reset token
/// - `POST /reset-password` - Redeem a reset token and set a new password
///
/// Endpoints that take an email and send mail answer the same way whether
/// or not the account exists.

use crate::{
    app::AppState,
    envelope::{created, done, ok, ApiResponse},
    error::{ApiError, ApiResult, ErrorMessage},
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use scopegate_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
        password,
        tokens::{self, TokenError},
    },
    lock,
    mail::Mail,
    models::{
        one_time_token::{OneTimeToken, TokenPurpose},
        permission::{Permission, PermissionName},
        scope::{Scope, PERSONAL},
        session::{CreateSession, Session},
        user::{normalize_email, CreateUser, StartingGrant, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength after the length rule
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Public view of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

/// Body carrying only an email address
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Body carrying only a one-time token
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Reset password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

fn check_password_strength(password: &str) -> ApiResult<()> {
    password::validate_password_strength(password)
        .map_err(|message| ApiError::invalid_field("password", message))
}

/// Mails a freshly issued one-time token
///
/// Delivery failures are logged; the token stays valid and can be resent.
async fn mail_token(state: &AppState, purpose: TokenPurpose, user: &User, token: &str) {
    let mail = match purpose {
        TokenPurpose::EmailVerification => Mail::verification(state.base_url(), &user.email, token),
        TokenPurpose::PasswordReset => Mail::password_reset(state.base_url(), &user.email, token),
    };

    if let Err(e) = state.mailer.send(mail).await {
        tracing::warn!(user_id = %user.id, error = %e, ?purpose, "failed to send mail");
    }
}

/// Issues a one-time token and mails it
async fn send_one_time_token(
    state: &AppState,
    purpose: TokenPurpose,
    user: &User,
) -> ApiResult<()> {
    let (token, token_hash) = tokens::generate_token();
    OneTimeToken::issue(&state.db, purpose, user.id, &token_hash).await?;
    mail_token(state, purpose, user, &token).await;

    Ok(())
}

/// Default post permissions, bound to the personal scope
///
/// Catalog entries that no longer exist are skipped.
async fn default_grants(state: &AppState) -> ApiResult<Vec<StartingGrant>> {
    let personal = Scope::find_by_name(&state.db, PERSONAL).await?;
    let mut grants = Vec::with_capacity(PermissionName::DEFAULT_FOR_NEW_USERS.len());

    for name in PermissionName::DEFAULT_FOR_NEW_USERS {
        let Some(permission) = Permission::find_by_name(&state.db, name.as_str()).await? else {
            tracing::warn!(permission = %name, "default permission missing from catalog");
            continue;
        };

        grants.push(StartingGrant {
            permission_id: permission.id,
            scope_id: personal.as_ref().map(|s| s.id),
        });
    }

    Ok(grants)
}

/// Resolves an unused, unexpired token to its row
async fn find_token(
    state: &AppState,
    purpose: TokenPurpose,
    token: &str,
) -> ApiResult<OneTimeToken> {
    let hash = tokens::lookup_hash(token)?;

    OneTimeToken::find_valid(&state.db, purpose, &hash)
        .await?
        .ok_or_else(|| TokenError::InvalidOrExpired.into())
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "SecureP@ss123", "name": "Jane" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<UserResponse>> {
    req.validate()?;
    check_password_strength(&req.password)?;

    if User::email_exists(&state.db, &req.email).await? {
        return Err(ErrorMessage::EmailTaken.into());
    }

    let password_hash = password::hash_password(&req.password)?;
    let grants = default_grants(&state).await?;
    let (token, token_hash) = tokens::generate_token();

    let user = User::register(
        &state.db,
        CreateUser {
            email: normalize_email(&req.email),
            password_hash,
            name: req.name,
        },
        &grants,
        &token_hash,
    )
    .await?;

    mail_token(&state, TokenPurpose::EmailVerification, &user, &token).await;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(created(
        "Registration successful, check your email to verify your account",
        user.into(),
    ))
}

/// Verify an email address
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown, expired, or already used
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;

    let token = find_token(&state, TokenPurpose::EmailVerification, &req.token).await?;

    if !OneTimeToken::consume(&state.db, TokenPurpose::EmailVerification, token.id).await? {
        return Err(TokenError::InvalidOrExpired.into());
    }

    User::mark_verified(&state.db, token.user_id).await?;
    tracing::info!(user_id = %token.user_id, "email verified");

    Ok(done("Email verified successfully"))
}

/// Resend the verification email
///
/// Succeeds for unknown and already-verified addresses without sending.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        if !user.email_verified {
            send_one_time_token(&state, TokenPurpose::EmailVerification, &user).await?;
        }
    }

    Ok(done(
        "If the account exists and is not verified, a verification email has been sent",
    ))
}

/// Login and get tokens
///
/// Checks run in order under the user's login lock: password, verified
/// email, no open session.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden`: Email not verified
/// - `409 Conflict`: User already logged in, or a concurrent login holds the lock
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    req.validate()?;

    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        password::dummy_verify(&req.password);
        return Err(ErrorMessage::InvalidCredentials.into());
    };

    let key = lock::login_key(user.id);
    let db = &state.db;
    let secret = state.jwt_secret();
    let candidate = req.password.as_str();
    let account = &user;

    let (session, pair) = state
        .locks
        .with_lock(&key, move || async move {
            if !password::verify_password(candidate, &account.password_hash)? {
                return Err(ApiError::from(ErrorMessage::InvalidCredentials));
            }

            if !account.email_verified {
                return Err(ErrorMessage::EmailNotVerified.into());
            }

            if Session::has_active(db, account.id).await? {
                return Err(ErrorMessage::AlreadyLoggedIn.into());
            }

            let session_id = Uuid::new_v4();
            let pair = jwt::issue_token_pair(account.id, session_id, secret)?;

            let session = Session::create(
                db,
                CreateSession {
                    id: session_id,
                    user_id: account.id,
                    refresh_token_hash: tokens::hash_token(&pair.refresh_token),
                    expires_at: Utc::now() + TokenType::Refresh.default_expiration(),
                },
            )
            .await?;

            Ok((session, pair))
        })
        .await?;

    tracing::info!(user_id = %session.user_id, session_id = %session.id, "user logged in");

    Ok(ok(
        "Login successful",
        LoginResponse {
            user: user.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: TokenType::Access.default_expiration().num_seconds(),
        },
    ))
}

/// Logout, closing the session the access token belongs to
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<()>> {
    Session::revoke(&state.db, auth.session_id).await?;
    tracing::info!(user_id = %auth.user_id, session_id = %auth.session_id, "user logged out");

    Ok(done("Logout successful"))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Token invalid, or its session closed or rotated
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    req.validate()?;

    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let session = Session::find_active(&state.db, claims.sid)
        .await?
        .ok_or(ErrorMessage::SessionInactive)?;

    if session.user_id != claims.sub
        || session.refresh_token_hash != tokens::hash_token(&req.refresh_token)
    {
        tracing::warn!(session_id = %claims.sid, "refresh token does not match session");
        return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
    }

    let access = Claims::new(claims.sub, claims.sid, TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;

    Ok(ok(
        "Token refreshed",
        RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: TokenType::Access.default_expiration().num_seconds(),
        },
    ))
}

/// Mail a password reset link
///
/// Only verified accounts receive one; the response is the same regardless.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        if user.email_verified {
            send_one_time_token(&state, TokenPurpose::PasswordReset, &user).await?;
        }
    }

    Ok(done(
        "If the account exists, a password reset email has been sent",
    ))
}

/// Set a new password with a reset token
///
/// Every open session of the user is closed afterwards.
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown, expired, or already used
/// - `409 Conflict`: A concurrent reset holds the lock
/// - `422 Unprocessable Entity`: Weak password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    req.validate()?;

    let token = find_token(&state, TokenPurpose::PasswordReset, &req.token).await?;
    let user_id = token.user_id;

    let key = lock::password_reset_key(user_id);
    let db = &state.db;
    let new_password = req.password.as_str();

    let revoked = state
        .locks
        .with_lock(&key, move || async move {
            check_password_strength(new_password)?;
            let password_hash = password::hash_password(new_password)?;

            if !OneTimeToken::consume(db, TokenPurpose::PasswordReset, token.id).await? {
                return Err(ApiError::from(TokenError::InvalidOrExpired));
            }

            if !User::update_password(db, user_id, &password_hash).await? {
                return Err(ErrorMessage::UserNotFound.into());
            }

            Ok(Session::revoke_all_for_user(db, user_id).await?)
        })
        .await?;

    tracing::info!(user_id = %user_id, sessions_revoked = revoked, "password reset");

    Ok(done("Password reset successful"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: None,
        };

        let err = ApiError::from(req.validate().unwrap_err());
        match err {
            ApiError::ValidationError(details) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_weak_password_rejected() {
        assert!(check_password_strength("alllowercase").is_err());
        assert!(check_password_strength("Str0ng!Passw0rd").is_ok());
    }

    #[test]
    fn test_login_request_requires_password() {
        let req = LoginRequest {
            email: "user@example.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_user_response_hides_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: Some("Jane".to_string()),
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("user@example.com"));
    }
}

/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use scopegate_api::{app::{build_router, AppState}, config::Config};
/// use scopegate_shared::lock::{memory::MemoryLock, LockManager, LockSettings};
/// use scopegate_shared::mail::LogMailer;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let locks = LockManager::new(Arc::new(MemoryLock::new()), LockSettings::default());
/// let state = AppState::new(pool, config, locks, Arc::new(LogMailer));
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use scopegate_shared::{crypto::PayloadCipher, lock::LockManager, mail::Mailer};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Per-key locks for login, password reset and post mutation
    pub locks: LockManager,

    /// Encrypts `data` of sensitive responses
    pub cipher: PayloadCipher,

    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, locks: LockManager, mailer: Arc<dyn Mailer>) -> Self {
        let cipher = PayloadCipher::new(&config.encryption.secret);

        Self {
            db,
            config: Arc::new(config),
            locks,
            cipher,
            mailer,
        }
    }

    /// Replaces the payload cipher (tests use fewer PBKDF2 iterations)
    pub fn with_cipher(mut self, cipher: PayloadCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Base of links sent by mail
    pub fn base_url(&self) -> &str {
        &self.config.api.base_url
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── POST /register, /verify-email, /resend-verification
/// ├── POST /login, /refresh, /forgot-password, /reset-password
/// └── (bearer auth)
///     ├── POST /logout
///     ├── GET|POST /post              GET|PUT|DELETE /post/:id
///     ├── GET|POST /permission        GET|PUT|DELETE /permission/:id
///     └── GET|POST /user-permission   GET|PUT|DELETE /user-permission/:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/verify-email", post(routes::auth::verify_email))
        .route("/resend-verification", post(routes::auth::resend_verification))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password", post(routes::auth::reset_password));

    let protected_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route(
            "/post",
            get(routes::posts::list_posts).post(routes::posts::create_post),
        )
        .route(
            "/post/:id",
            get(routes::posts::get_post)
                .put(routes::posts::update_post)
                .delete(routes::posts::delete_post),
        )
        .route(
            "/permission",
            get(routes::permissions::list_permissions).post(routes::permissions::create_permission),
        )
        .route(
            "/permission/:id",
            get(routes::permissions::get_permission)
                .put(routes::permissions::update_permission)
                .delete(routes::permissions::delete_permission),
        )
        .route(
            "/user-permission",
            get(routes::user_permissions::list_user_permissions)
                .post(routes::user_permissions::create_user_permission),
        )
        .route(
            "/user-permission/:id",
            get(routes::user_permissions::get_user_permission)
                .put(routes::user_permissions::update_user_permission)
                .delete(routes::user_permissions::delete_user_permission),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

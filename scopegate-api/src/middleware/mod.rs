/// Middleware modules for the API server
///
/// - `auth`: Bearer token and session check for protected routes
/// - `security`: Security response headers

pub mod auth;
pub mod security;

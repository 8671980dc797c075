/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, verification, sessions and password reset
/// - `posts`: Post CRUD
/// - `permissions`: Permission catalog
/// - `user_permissions`: Permission grants

pub mod auth;
pub mod health;
pub mod permissions;
pub mod posts;
pub mod user_permissions;

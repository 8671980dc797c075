//! # Scopegate Shared Library
//!
//! This crate contains the types, persistence and authorization logic used by
//! the Scopegate API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication, permission and scope resolution
//! - `crypto`: Response payload encryption
//! - `db`: Connection pool and migrations
//! - `lock`: Per-key distributed locks
//! - `mail`: Outgoing mail seam
//! - `redis`: Redis client

pub mod auth;
pub mod crypto;
pub mod db;
pub mod lock;
pub mod mail;
pub mod models;
pub mod redis;

/// Current version of the Scopegate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

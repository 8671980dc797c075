//! # Scopegate API Server Library
//!
//! HTTP surface of Scopegate: authentication, posts, the permission catalog
//! and user permission grants, all answered in one response envelope.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `envelope`: Response envelope and encrypted payloads
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Authentication and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod routes;

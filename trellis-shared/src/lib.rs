//! # Trellis Shared Library
//!
//! This crate contains the project-scoped authorization model, the task
//! lifecycle and the notification engine used by the Trellis API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Passwords, session tokens, membership guard, axum middleware
//! - `services`: Project, task, notification and analysis operations
//! - `db`: Connection pool and migrations
//! - `error`: Core error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

/// Current version of the Trellis shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

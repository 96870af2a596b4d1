//! # Trellis API Server Library
//!
//! HTTP surface over the Trellis core: session authentication, projects and
//! their memberships, tasks, notifications and project analysis.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

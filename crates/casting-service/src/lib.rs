//! Casting Service Library
//!
//! REST backend for a casting agency: movies and actors behind bearer-token
//! authentication and per-route permissions.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//!                        |
//!                        v
//!                  auth/jwt.rs -> auth/jwks.rs (identity-provider JWKS)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification, key resolution and permission checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth gate and HTTP metrics
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - Storage behind the `CastingRepository` trait
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;

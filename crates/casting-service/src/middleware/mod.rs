//! HTTP middleware for the casting service.
//!
//! # Components
//!
//! - `auth` - Bearer-token authentication and per-route permission checks
//! - `http_metrics` - Request/response metrics for every route

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, require_permission, AuthState, PermissionGate};
pub use http_metrics::http_metrics_middleware;

//! Liveness handlers.
//!
//! - `/`: service banner
//! - `/health`: liveness probe, returns OK if the process is running

use crate::models::StatusResponse;
use axum::Json;

/// Handler for GET /
pub async fn index() -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        description: "App is running.".to_string(),
    })
}

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

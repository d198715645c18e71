//! HTTP request handlers for the casting service.

pub mod actors;
pub mod health;
pub mod me;
pub mod metrics;
pub mod movies;

pub use actors::{create_actor, delete_actor, list_actors, update_actor};
pub use health::{health_check, index};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, list_movies, update_movie};

use crate::errors::ApiError;
use crate::repositories::RepositoryError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;

/// Unwrap a JSON body, turning any rejection (syntax, content type, shape)
/// into a 400.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Unwrap a numeric record id. Non-numeric ids address no record.
fn record_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::NotFound(e.body_text()))
}

/// Keep a string field only if it has non-whitespace content.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn storage_error(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::UnknownMovie(id) => {
            ApiError::Unprocessable(format!("movie {} does not exist", id))
        }
        RepositoryError::Storage(reason) => {
            tracing::error!(target: "casting.handlers", reason = %reason, "Repository failure");
            ApiError::Internal
        }
    }
}

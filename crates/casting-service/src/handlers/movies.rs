//! Movie handlers.
//!
//! Every handler here sits behind the permission middleware; it only runs
//! once the caller's token has been verified and holds the route's permission.

use super::{json_body, non_blank, record_id, storage_error};
use crate::errors::ApiError;
use crate::models::{DeletedResponse, MovieListResponse, MovieRequest, MovieResponse, NewMovie};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Both fields are required, for creation and replacement alike.
fn new_movie(request: MovieRequest) -> Result<NewMovie, ApiError> {
    match (non_blank(request.title), non_blank(request.release_date)) {
        (Some(title), Some(release_date)) => Ok(NewMovie {
            title,
            release_date,
        }),
        _ => Err(ApiError::BadRequest(
            "title and release_date are required".to_string(),
        )),
    }
}

/// Handler for GET /movies
///
/// Returns 404 when no movies exist.
#[instrument(skip_all, name = "casting.handlers.movies.list")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let movies = state.repository.list_movies().await.map_err(storage_error)?;

    if movies.is_empty() {
        return Err(ApiError::NotFound("movies".to_string()));
    }

    Ok(Json(MovieListResponse {
        success: true,
        movies,
    }))
}

/// Handler for POST /movies
#[instrument(skip_all, name = "casting.handlers.movies.create")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MovieRequest>, JsonRejection>,
) -> Result<Json<MovieResponse>, ApiError> {
    let movie = new_movie(json_body(body)?)?;

    let movie = state
        .repository
        .create_movie(movie)
        .await
        .map_err(storage_error)?;

    tracing::info!(target: "casting.handlers.movies", movie_id = movie.id, "Movie created");

    Ok(Json(MovieResponse {
        success: true,
        movie,
    }))
}

/// Handler for PATCH /movies/:id
///
/// Unknown ids are reported before missing fields.
#[instrument(skip_all, name = "casting.handlers.movies.update")]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<MovieRequest>, JsonRejection>,
) -> Result<Json<MovieResponse>, ApiError> {
    let id = record_id(id)?;
    let request = json_body(body)?;

    if state
        .repository
        .get_movie(id)
        .await
        .map_err(storage_error)?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("movie {}", id)));
    }

    let movie = state
        .repository
        .update_movie(id, new_movie(request)?)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::NotFound(format!("movie {}", id)))?;

    tracing::info!(target: "casting.handlers.movies", movie_id = id, "Movie updated");

    Ok(Json(MovieResponse {
        success: true,
        movie,
    }))
}

/// Handler for DELETE /movies/:id
#[instrument(skip_all, name = "casting.handlers.movies.delete")]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = record_id(id)?;

    if !state
        .repository
        .delete_movie(id)
        .await
        .map_err(storage_error)?
    {
        return Err(ApiError::NotFound(format!("movie {}", id)));
    }

    tracing::info!(target: "casting.handlers.movies", movie_id = id, "Movie deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}

//! Actor handlers.

use super::{json_body, non_blank, record_id, storage_error};
use crate::errors::ApiError;
use crate::models::{
    ActorChanges, ActorListResponse, ActorRequest, ActorResponse, DeletedResponse, NewActor,
};
use crate::routes::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

fn check_age(age: Option<i64>) -> Result<Option<i64>, ApiError> {
    match age {
        Some(age) if age < 0 => Err(ApiError::BadRequest("age must not be negative".to_string())),
        _ => Ok(age),
    }
}

fn new_actor(request: ActorRequest) -> Result<NewActor, ApiError> {
    let age = check_age(request.age)?;

    match (non_blank(request.name), age, non_blank(request.gender)) {
        (Some(name), Some(age), Some(gender)) => Ok(NewActor {
            name,
            age,
            gender,
            movie_id: request.movie_id,
        }),
        _ => Err(ApiError::BadRequest(
            "name, age and gender are required".to_string(),
        )),
    }
}

/// Blank strings count as "not provided" and leave the field unchanged.
fn actor_changes(request: ActorRequest) -> Result<ActorChanges, ApiError> {
    Ok(ActorChanges {
        age: check_age(request.age)?,
        name: non_blank(request.name),
        gender: non_blank(request.gender),
        movie_id: request.movie_id,
    })
}

/// Handler for GET /actors
///
/// Returns 404 when no actors exist.
#[instrument(skip_all, name = "casting.handlers.actors.list")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActorListResponse>, ApiError> {
    let actors = state.repository.list_actors().await.map_err(storage_error)?;

    if actors.is_empty() {
        return Err(ApiError::NotFound("actors".to_string()));
    }

    Ok(Json(ActorListResponse {
        success: true,
        actors,
    }))
}

/// Handler for POST /actors
///
/// `movie_id` is optional but must name an existing movie (422 otherwise).
#[instrument(skip_all, name = "casting.handlers.actors.create")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<ActorResponse>, ApiError> {
    let actor = new_actor(json_body(body)?)?;

    let actor = state
        .repository
        .create_actor(actor)
        .await
        .map_err(storage_error)?;

    tracing::info!(target: "casting.handlers.actors", actor_id = actor.id, "Actor created");

    Ok(Json(ActorResponse {
        success: true,
        actor,
    }))
}

/// Handler for PATCH /actors/:id
///
/// Partial update: only the provided fields change.
#[instrument(skip_all, name = "casting.handlers.actors.update")]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ActorRequest>, JsonRejection>,
) -> Result<Json<ActorResponse>, ApiError> {
    let id = record_id(id)?;
    let request = json_body(body)?;

    if state
        .repository
        .get_actor(id)
        .await
        .map_err(storage_error)?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("actor {}", id)));
    }

    let actor = state
        .repository
        .update_actor(id, actor_changes(request)?)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::NotFound(format!("actor {}", id)))?;

    tracing::info!(target: "casting.handlers.actors", actor_id = id, "Actor updated");

    Ok(Json(ActorResponse {
        success: true,
        actor,
    }))
}

/// Handler for DELETE /actors/:id
#[instrument(skip_all, name = "casting.handlers.actors.delete")]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = record_id(id)?;

    if !state
        .repository
        .delete_actor(id)
        .await
        .map_err(storage_error)?
    {
        return Err(ApiError::NotFound(format!("actor {}", id)));
    }

    tracing::info!(target: "casting.handlers.actors", actor_id = id, "Actor deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, age: Option<i64>, gender: Option<&str>) -> ActorRequest {
        ActorRequest {
            name: name.map(str::to_string),
            age,
            gender: gender.map(str::to_string),
            movie_id: None,
        }
    }

    #[test]
    fn test_new_actor_requires_name_age_gender() {
        let actor = new_actor(request(Some("Ada"), Some(30), Some("female"))).unwrap();
        assert_eq!(actor.age, 30);
        assert_eq!(actor.movie_id, None);

        for incomplete in [
            request(None, Some(30), Some("female")),
            request(Some("Ada"), None, Some("female")),
            request(Some("Ada"), Some(30), Some("")),
        ] {
            assert!(matches!(new_actor(incomplete), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn test_negative_age_rejected() {
        assert!(matches!(
            new_actor(request(Some("Ada"), Some(-1), Some("female"))),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            actor_changes(request(None, Some(-1), None)),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_actor_changes_ignore_blank_strings() {
        let changes = actor_changes(request(Some(" "), Some(0), None)).unwrap();

        assert_eq!(
            changes,
            ActorChanges {
                age: Some(0),
                ..Default::default()
            }
        );
    }
}

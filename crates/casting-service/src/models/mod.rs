//! Casting service models.
//!
//! Records, request bodies and response bodies for the movie/actor API.

use serde::{Deserialize, Serialize};

/// A movie record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Release date as supplied by the client (free-form string).
    pub release_date: String,
}

/// An actor record, optionally cast in one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub movie_id: Option<i64>,
}

/// Fields for a new movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub release_date: String,
}

/// Fields for a new actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub movie_id: Option<i64>,
}

/// Partial actor update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorChanges {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub movie_id: Option<i64>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /movies` and `PATCH /movies/:id`.
///
/// Fields are optional at the wire level so missing fields produce a
/// 400 from the handler rather than a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

/// Body of `POST /actors` and `PATCH /actors/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub movie_id: Option<i64>,
}

// ============================================================================
// Response bodies
// ============================================================================

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub description: String,
}

/// Response for `GET /movies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieListResponse {
    pub success: bool,
    pub movies: Vec<Movie>,
}

/// Response for a created or updated movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieResponse {
    pub success: bool,
    pub movie: Movie,
}

/// Response for `GET /actors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorListResponse {
    pub success: bool,
    pub actors: Vec<Actor>,
}

/// Response for a created or updated actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorResponse {
    pub success: bool,
    pub actor: Actor,
}

/// Response for a deleted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted: i64,
}

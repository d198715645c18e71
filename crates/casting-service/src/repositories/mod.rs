//! Repository layer for the casting service.
//!
//! Handlers talk to storage only through `CastingRepository`, so the backing
//! store can be swapped without touching the HTTP surface.

pub mod memory;

pub use memory::InMemoryRepository;

use crate::models::{Actor, ActorChanges, Movie, NewActor, NewMovie};
use async_trait::async_trait;
use thiserror::Error;

/// Repository failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// An actor references a movie that does not exist.
    #[error("movie {0} does not exist")]
    UnknownMovie(i64),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Storage for movies and actors.
///
/// Lookups by id return `Ok(None)` / `Ok(false)` for unknown ids; errors are
/// reserved for constraint and storage failures.
#[async_trait]
pub trait CastingRepository: Send + Sync {
    /// All movies ordered by id.
    async fn list_movies(&self) -> Result<Vec<Movie>, RepositoryError>;

    async fn get_movie(&self, id: i64) -> Result<Option<Movie>, RepositoryError>;

    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, RepositoryError>;

    /// Replace title and release date. `None` if the movie does not exist.
    async fn update_movie(&self, id: i64, movie: NewMovie)
        -> Result<Option<Movie>, RepositoryError>;

    /// Delete a movie, detaching any actors cast in it.
    async fn delete_movie(&self, id: i64) -> Result<bool, RepositoryError>;

    /// All actors ordered by id.
    async fn list_actors(&self) -> Result<Vec<Actor>, RepositoryError>;

    async fn get_actor(&self, id: i64) -> Result<Option<Actor>, RepositoryError>;

    async fn create_actor(&self, actor: NewActor) -> Result<Actor, RepositoryError>;

    /// Apply a partial update. `None` if the actor does not exist.
    async fn update_actor(
        &self,
        id: i64,
        changes: ActorChanges,
    ) -> Result<Option<Actor>, RepositoryError>;

    async fn delete_actor(&self, id: i64) -> Result<bool, RepositoryError>;
}

//! In-memory repository.

use super::{CastingRepository, RepositoryError};
use crate::models::{Actor, ActorChanges, Movie, NewActor, NewMovie};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Store {
    movies: BTreeMap<i64, Movie>,
    actors: BTreeMap<i64, Actor>,
    last_movie_id: i64,
    last_actor_id: i64,
}

impl Store {
    fn check_movie(&self, movie_id: Option<i64>) -> Result<(), RepositoryError> {
        match movie_id {
            Some(id) if !self.movies.contains_key(&id) => Err(RepositoryError::UnknownMovie(id)),
            _ => Ok(()),
        }
    }
}

/// Process-local store. Ids are assigned sequentially from 1 and never reused.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CastingRepository for InMemoryRepository {
    async fn list_movies(&self) -> Result<Vec<Movie>, RepositoryError> {
        Ok(self.store.read().await.movies.values().cloned().collect())
    }

    async fn get_movie(&self, id: i64) -> Result<Option<Movie>, RepositoryError> {
        Ok(self.store.read().await.movies.get(&id).cloned())
    }

    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, RepositoryError> {
        let mut store = self.store.write().await;
        store.last_movie_id += 1;

        let movie = Movie {
            id: store.last_movie_id,
            title: movie.title,
            release_date: movie.release_date,
        };
        store.movies.insert(movie.id, movie.clone());

        Ok(movie)
    }

    async fn update_movie(
        &self,
        id: i64,
        movie: NewMovie,
    ) -> Result<Option<Movie>, RepositoryError> {
        let mut store = self.store.write().await;

        Ok(store.movies.get_mut(&id).map(|existing| {
            existing.title = movie.title;
            existing.release_date = movie.release_date;
            existing.clone()
        }))
    }

    async fn delete_movie(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut store = self.store.write().await;

        if store.movies.remove(&id).is_none() {
            return Ok(false);
        }

        for actor in store.actors.values_mut() {
            if actor.movie_id == Some(id) {
                actor.movie_id = None;
            }
        }

        Ok(true)
    }

    async fn list_actors(&self) -> Result<Vec<Actor>, RepositoryError> {
        Ok(self.store.read().await.actors.values().cloned().collect())
    }

    async fn get_actor(&self, id: i64) -> Result<Option<Actor>, RepositoryError> {
        Ok(self.store.read().await.actors.get(&id).cloned())
    }

    async fn create_actor(&self, actor: NewActor) -> Result<Actor, RepositoryError> {
        let mut store = self.store.write().await;
        store.check_movie(actor.movie_id)?;
        store.last_actor_id += 1;

        let actor = Actor {
            id: store.last_actor_id,
            name: actor.name,
            age: actor.age,
            gender: actor.gender,
            movie_id: actor.movie_id,
        };
        store.actors.insert(actor.id, actor.clone());

        Ok(actor)
    }

    async fn update_actor(
        &self,
        id: i64,
        changes: ActorChanges,
    ) -> Result<Option<Actor>, RepositoryError> {
        let mut store = self.store.write().await;
        if !store.actors.contains_key(&id) {
            return Ok(None);
        }
        store.check_movie(changes.movie_id)?;

        Ok(store.actors.get_mut(&id).map(|actor| {
            if let Some(name) = changes.name {
                actor.name = name;
            }
            if let Some(age) = changes.age {
                actor.age = age;
            }
            if let Some(gender) = changes.gender {
                actor.gender = gender;
            }
            if let Some(movie_id) = changes.movie_id {
                actor.movie_id = Some(movie_id);
            }
            actor.clone()
        }))
    }

    async fn delete_actor(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.store.write().await.actors.remove(&id).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            release_date: "2024-05-01".to_string(),
        }
    }

    fn new_actor(name: &str, movie_id: Option<i64>) -> NewActor {
        NewActor {
            name: name.to_string(),
            age: 40,
            gender: "female".to_string(),
            movie_id,
        }
    }

    #[tokio::test]
    async fn test_movie_lifecycle() {
        let repo = InMemoryRepository::new();
        assert!(repo.list_movies().await.unwrap().is_empty());

        let first = repo.create_movie(new_movie("Heat")).await.unwrap();
        let second = repo.create_movie(new_movie("Ronin")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(repo.get_movie(2).await.unwrap(), Some(second.clone()));
        assert_eq!(repo.get_movie(3).await.unwrap(), None);

        let updated = repo
            .update_movie(first.id, new_movie("Heat (Director's Cut)"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Heat (Director's Cut)");

        assert!(repo.delete_movie(first.id).await.unwrap());
        assert!(!repo.delete_movie(first.id).await.unwrap());

        let remaining = repo.list_movies().await.unwrap();
        assert_eq!(remaining, vec![second]);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let repo = InMemoryRepository::new();

        let first = repo.create_movie(new_movie("Heat")).await.unwrap();
        repo.delete_movie(first.id).await.unwrap();
        let next = repo.create_movie(new_movie("Ronin")).await.unwrap();

        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_records() {
        let repo = InMemoryRepository::new();

        assert_eq!(repo.update_movie(9, new_movie("x")).await.unwrap(), None);
        assert_eq!(
            repo.update_actor(9, ActorChanges::default()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_actor_requires_existing_movie() {
        let repo = InMemoryRepository::new();

        let err = repo.create_actor(new_actor("Ada", Some(3))).await.unwrap_err();
        assert_eq!(err, RepositoryError::UnknownMovie(3));

        let movie = repo.create_movie(new_movie("Heat")).await.unwrap();
        let actor = repo
            .create_actor(new_actor("Ada", Some(movie.id)))
            .await
            .unwrap();
        assert_eq!(actor.movie_id, Some(movie.id));

        let err = repo
            .update_actor(
                actor.id,
                ActorChanges {
                    movie_id: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::UnknownMovie(42));
    }

    #[tokio::test]
    async fn test_actor_partial_update() {
        let repo = InMemoryRepository::new();
        let actor = repo.create_actor(new_actor("Ada", None)).await.unwrap();

        let updated = repo
            .update_actor(
                actor.id,
                ActorChanges {
                    age: Some(41),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.age, 41);
        assert_eq!(updated.gender, "female");
    }

    #[tokio::test]
    async fn test_deleting_movie_detaches_actors() {
        let repo = InMemoryRepository::new();
        let movie = repo.create_movie(new_movie("Heat")).await.unwrap();
        let actor = repo
            .create_actor(new_actor("Ada", Some(movie.id)))
            .await
            .unwrap();

        repo.delete_movie(movie.id).await.unwrap();

        let actors = repo.list_actors().await.unwrap();
        assert_eq!(actors.len(), 1);
        assert_eq!(actors[0].id, actor.id);
        assert_eq!(actors[0].movie_id, None);
    }

    #[tokio::test]
    async fn test_delete_actor() {
        let repo = InMemoryRepository::new();
        let actor = repo.create_actor(new_actor("Ada", None)).await.unwrap();

        assert_eq!(repo.get_actor(actor.id).await.unwrap(), Some(actor.clone()));
        assert!(repo.delete_actor(actor.id).await.unwrap());
        assert_eq!(repo.get_actor(actor.id).await.unwrap(), None);
        assert!(!repo.delete_actor(actor.id).await.unwrap());
        assert!(repo.list_actors().await.unwrap().is_empty());
    }
}

//! HTTP routes for the casting service.
//!
//! Defines the Axum router and application state.

use crate::auth::permissions::{
    CREATE_ACTORS, CREATE_MOVIES, DELETE_ACTORS, DELETE_MOVIES, GET_ACTORS, GET_MOVIES,
    UPDATE_ACTORS, UPDATE_MOVIES,
};
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, require_permission, AuthState};
use crate::repositories::CastingRepository;
use axum::{
    handler::Handler,
    http::{header, Method},
    middleware,
    routing::{get, patch},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Movie and actor storage.
    pub repository: Arc<dyn CastingRepository>,
}

/// CORS policy: any origin, bearer-token and JSON headers, the API's methods.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/`, `/health`, `/metrics` - public
/// - `/movies`, `/movies/:id`, `/actors`, `/actors/:id` - each method gated by
///   its own permission
/// - `/me` - any valid token
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - CORS and a 30 second request timeout
pub fn build_routes(
    state: Arc<AppState>,
    auth: AuthState,
    metrics_handle: PrometheusHandle,
) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let gate = |permission: &'static str| {
        middleware::from_fn_with_state(auth.require(permission), require_permission)
    };

    // Protected routes: every method carries its own permission gate
    let protected_routes = Router::new()
        .route(
            "/movies",
            get(handlers::list_movies.layer(gate(GET_MOVIES)))
                .post(handlers::create_movie.layer(gate(CREATE_MOVIES))),
        )
        .route(
            "/movies/:id",
            patch(handlers::update_movie.layer(gate(UPDATE_MOVIES)))
                .delete(handlers::delete_movie.layer(gate(DELETE_MOVIES))),
        )
        .route(
            "/actors",
            get(handlers::list_actors.layer(gate(GET_ACTORS)))
                .post(handlers::create_actor.layer(gate(CREATE_ACTORS))),
        )
        .route(
            "/actors/:id",
            patch(handlers::update_actor.layer(gate(UPDATE_ACTORS)))
                .delete(handlers::delete_actor.layer(gate(DELETE_ACTORS))),
        )
        .route(
            "/me",
            get(handlers::get_me.layer(middleware::from_fn_with_state(
                auth.clone(),
                require_auth,
            ))),
        );

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before auth runs
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(protected_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{ClaimExpectations, JwksResponse, StaticKeySet, TokenVerifier};
    use crate::models::{Actor, ActorChanges, Movie, NewActor, NewMovie};
    use crate::repositories::{InMemoryRepository, RepositoryError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use casting_test_utils::crypto_fixtures::TestKeypair;
    use casting_test_utils::token_builders::TestTokenBuilder;
    use http_body_util::BodyExt;
    use jsonwebtoken::Algorithm;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    const ISSUER: &str = "https://casting.test.local/";
    const AUDIENCE: &str = "casting-api";

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    fn test_app(key: &TestKeypair, repository: Arc<dyn CastingRepository>) -> Router {
        let jwks: JwksResponse =
            serde_json::from_value(serde_json::json!({ "keys": [key.jwk_json()] })).unwrap();
        let verifier = TokenVerifier::new(
            Arc::new(StaticKeySet::new(jwks)),
            vec![Algorithm::RS256],
            ClaimExpectations {
                issuer: ISSUER.to_string(),
                audience: AUDIENCE.to_string(),
                leeway_seconds: 0,
            },
        );
        let state = Arc::new(AppState { repository });
        // Not installed globally; only used to render
        let handle = PrometheusBuilder::new().build_recorder().handle();

        build_routes(state, AuthState::new(Arc::new(verifier)), handle)
    }

    fn bearer(key: &TestKeypair, permissions: &[&str]) -> String {
        let token = TestTokenBuilder::new(ISSUER, AUDIENCE)
            .with_permissions(permissions)
            .sign(key);
        format!("Bearer {token}")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_and_health_are_public() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"success": true, "description": "App is running."})
        );

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let response = app
            .oneshot(Request::get("/directors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_is_not_gated() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/movies")
            .header(header::ORIGIN, "https://frontend.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("PATCH"));
    }

    #[tokio::test]
    async fn test_each_method_has_its_own_permission() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        // get:movies does not open POST /movies
        let request = Request::post("/movies")
            .header(header::AUTHORIZATION, bearer(&key, &["get:movies"]))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Heat","release_date":"1995-12-15"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = Request::post("/movies")
            .header(header::AUTHORIZATION, bearer(&key, &["create:movies"]))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Heat","release_date":"1995-12-15"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["movie"]["title"], "Heat");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let request = Request::post("/actors")
            .header(header::AUTHORIZATION, bearer(&key, &["create:actors"]))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_not_found() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let request = Request::delete("/movies/abc")
            .header(header::AUTHORIZATION, bearer(&key, &["delete:movies"]))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_public() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(InMemoryRepository::new()));

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Repository whose backing store is down.
    struct BrokenRepository;

    #[async_trait]
    impl CastingRepository for BrokenRepository {
        async fn list_movies(&self) -> Result<Vec<Movie>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn get_movie(&self, _id: i64) -> Result<Option<Movie>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn create_movie(&self, _movie: NewMovie) -> Result<Movie, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn update_movie(
            &self,
            _id: i64,
            _movie: NewMovie,
        ) -> Result<Option<Movie>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn delete_movie(&self, _id: i64) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn list_actors(&self) -> Result<Vec<Actor>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn get_actor(&self, _id: i64) -> Result<Option<Actor>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn create_actor(&self, _actor: NewActor) -> Result<Actor, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn update_actor(
            &self,
            _id: i64,
            _changes: ActorChanges,
        ) -> Result<Option<Actor>, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
        async fn delete_actor(&self, _id: i64) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Storage("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic_internal_error() {
        let key = TestKeypair::rsa("rsa-key-01");
        let app = test_app(&key, Arc::new(BrokenRepository));

        let request = Request::get("/actors")
            .header(header::AUTHORIZATION, bearer(&key, &["get:actors"]))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Internal Server Error");
        assert!(!body.to_string().contains("connection refused"));
    }
}

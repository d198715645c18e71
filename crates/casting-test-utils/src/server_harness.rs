//! Test server harness for E2E testing
//!
//! Provides `TestCastingServer`: the real router on a random local port, with
//! the identity provider's JWKS endpoint served by `wiremock`.

use crate::crypto_fixtures::{jwks_json, TestKeypair};
use crate::roles::Role;
use crate::token_builders::TestTokenBuilder;
use casting_service::auth::{JwksClient, TokenVerifier};
use casting_service::config::Config;
use casting_service::middleware::AuthState;
use casting_service::observability::metrics::init_metrics_recorder;
use casting_service::repositories::{CastingRepository, InMemoryRepository};
use casting_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Identity-provider domain used by every test server.
pub const TEST_AUTH_DOMAIN: &str = "casting.test.local";

/// Audience used by every test server.
pub const TEST_AUDIENCE: &str = "casting-api";

/// Issuer derived from [`TEST_AUTH_DOMAIN`].
pub const TEST_ISSUER: &str = "https://casting.test.local/";

/// `kid` of the key the mock JWKS publishes by default.
pub const TEST_KID: &str = "casting-test-key-01";

/// Path the mock JWKS is served on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// The global recorder can only be installed once per process.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the casting service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_assistant_can_list_movies() -> Result<(), anyhow::Error> {
///     let server = TestCastingServer::spawn().await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/movies", server.url()))
///         .bearer_auth(server.token_for(Role::CastingAssistant))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 404); // no movies yet
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    jwks_server: MockServer,
    signing_key: TestKeypair,
    repository: Arc<InMemoryRepository>,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn a server whose JWKS publishes the primary RSA key under
    /// [`TEST_KID`].
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(HashMap::new()).await
    }

    /// Spawn with extra configuration variables (e.g. `JWT_ALGORITHMS`).
    ///
    /// The server will:
    /// - Serve the JWKS from a `wiremock` server
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(extra_vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let signing_key = TestKeypair::rsa(TEST_KID);

        let jwks_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(&[&signing_key])))
            .mount(&jwks_server)
            .await;

        let mut vars = HashMap::from([
            ("AUTH0_DOMAIN".to_string(), TEST_AUTH_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}{}", jwks_server.uri(), JWKS_PATH),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(
            JwksClient::with_settings(
                config.jwks_url.clone(),
                config.jwks_fetch_timeout,
                config.jwks_cache_ttl,
            )
            .with_min_refresh_interval(config.jwks_min_refresh_interval),
        );
        let verifier = Arc::new(TokenVerifier::from_config(&config, jwks_client));

        let repository = Arc::new(InMemoryRepository::new());
        let state = Arc::new(AppState {
            repository: repository.clone(),
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, AuthState::new(verifier), metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            jwks_server,
            signing_key,
            repository,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mock identity-provider server, for asserting on JWKS fetches or
    /// mounting rotated key sets.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }

    /// The key published in the JWKS.
    pub fn signing_key(&self) -> &TestKeypair {
        &self.signing_key
    }

    /// Storage backing the server, for seeding and inspection.
    pub fn repository(&self) -> Arc<dyn CastingRepository> {
        self.repository.clone()
    }

    /// Token builder with this server's issuer and audience.
    pub fn token_builder(&self) -> TestTokenBuilder {
        TestTokenBuilder::new(&self.config.issuer, &self.config.audience)
    }

    /// A valid token for `role`, signed with the published key.
    pub fn token_for(&self, role: Role) -> String {
        self.token_builder()
            .with_role(role)
            .sign(&self.signing_key)
    }

    /// Replace the published key set (key rotation).
    pub async fn publish_keys(&self, keys: &[&TestKeypair]) {
        self.jwks_server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .mount(&self.jwks_server)
            .await;
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().ip().is_loopback());

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_uses_mock_jwks() -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn().await?;

        assert!(server
            .config()
            .jwks_url
            .starts_with(&server.jwks_server().uri()));
        assert_eq!(server.config().issuer, TEST_ISSUER);

        Ok(())
    }
}

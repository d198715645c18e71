//! Test token builders
//!
//! Builds claim sets in the identity provider's shape and signs them with
//! fixture keys. Invalid shapes (missing claims, wrong types, expired) are
//! first-class so negative tests read as plainly as positive ones.

use crate::crypto_fixtures::TestKeypair;
use crate::roles::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map, Value};

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new(ISSUER, AUDIENCE)
///     .with_role(Role::CastingDirector)
///     .expires_in(600)
///     .sign(&TestKeypair::rsa("rsa-key-01"));
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Valid for one hour, subject `auth0|test-user`, empty permissions.
    pub fn new(issuer: &str, audience: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(issuer));
        claims.insert("sub".to_string(), json!("auth0|test-user"));
        claims.insert("aud".to_string(), json!(audience));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + 3600));
        claims.insert("permissions".to_string(), json!([]));

        Self { claims }
    }

    pub fn for_subject(self, sub: &str) -> Self {
        self.with_claim("sub", json!(sub))
    }

    pub fn with_permissions(self, permissions: &[&str]) -> Self {
        self.with_claim("permissions", json!(permissions))
    }

    /// Subject and permissions of `role`.
    pub fn with_role(self, role: Role) -> Self {
        self.for_subject(role.subject())
            .with_permissions(role.permissions())
    }

    /// Drop the `permissions` claim entirely.
    pub fn without_permissions(self) -> Self {
        self.without_claim("permissions")
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Array-form `aud`.
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// `exp` set `seconds` from now.
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = chrono::Utc::now().timestamp() + seconds;
        self.with_claim("exp", json!(exp))
    }

    /// `exp` set `seconds` in the past.
    pub fn expired_seconds_ago(self, seconds: i64) -> Self {
        self.expires_in(-seconds)
    }

    /// Set any claim to any JSON value.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// The claim set as JSON.
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with `key`, declaring its `kid`.
    pub fn sign(&self, key: &TestKeypair) -> String {
        key.sign_claims(&self.build())
    }

    /// Sign with `key` but declare `kid` in the header.
    pub fn sign_with_kid(&self, key: &TestKeypair, kid: &str) -> String {
        key.sign_claims_with_kid(&self.build(), kid)
    }

    /// An `alg: none` token with an empty signature segment.
    pub fn unsigned(&self, kid: &str) -> String {
        let header = json!({"alg": "none", "typ": "JWT", "kid": kid});
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header.to_string().as_bytes()),
            URL_SAFE_NO_PAD.encode(self.build().to_string().as_bytes())
        )
    }
}

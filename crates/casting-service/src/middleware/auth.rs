//! Authentication and permission middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it with
//! the `TokenVerifier`, checks the route's required permission, and injects
//! the verified `TokenPayload` into request extensions for handlers.
//!
//! Handlers behind these layers are only ever invoked with a payload that
//! passed every check. Any failure short-circuits into an `AuthError`
//! response.

use crate::auth::{authorize, TokenPayload, TokenVerifier};
use crate::errors::AuthError;
use crate::observability::metrics::record_auth_decision;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier with its key resolver.
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Gate state for a route that requires `permission`.
    pub fn require(&self, permission: &'static str) -> PermissionGate {
        PermissionGate {
            auth: self.clone(),
            permission,
        }
    }

    /// Extract, verify and (optionally) authorize the request's bearer token.
    ///
    /// Records one auth decision metric per call.
    pub async fn check(
        &self,
        headers: &HeaderMap,
        permission: Option<&str>,
    ) -> Result<TokenPayload, AuthError> {
        let result = self.check_inner(headers, permission).await;

        match &result {
            Ok(_) => record_auth_decision("granted", "none"),
            Err(e) => record_auth_decision("rejected", e.code()),
        }

        result
    }

    async fn check_inner(
        &self,
        headers: &HeaderMap,
        permission: Option<&str>,
    ) -> Result<TokenPayload, AuthError> {
        let token = extract_bearer_token(headers)?;
        let payload = self.verifier.verify(token).await?;

        if let Some(required) = permission {
            authorize(&payload, required)?;
        }

        Ok(payload)
    }
}

/// Per-route state: the auth state plus the permission the route requires.
#[derive(Clone)]
pub struct PermissionGate {
    auth: AuthState,
    permission: &'static str,
}

impl PermissionGate {
    pub fn permission(&self) -> &'static str {
        self.permission
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. The header must be exactly the
/// scheme and one credential separated by a single space; tabs, repeated
/// spaces and empty parts are malformed.
///
/// # Errors
///
/// - `AuthError::MissingHeader` - no Authorization header
/// - `AuthError::MalformedHeader` - wrong scheme, missing credential, extra
///   parts, other separators, or a non-ASCII header value
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "casting.middleware.auth", "Missing Authorization header");
        AuthError::MissingHeader
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "casting.middleware.auth", "Authorization header is not valid ASCII");
        AuthError::MalformedHeader
    })?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.is_empty()
                && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => {
            tracing::debug!(target: "casting.middleware.auth", "Invalid Authorization header format");
            Err(AuthError::MalformedHeader)
        }
    }
}

/// Middleware that requires a valid token granting the route's permission.
///
/// # Response
///
/// - 401/400 with `WWW-Authenticate` if the token is missing, malformed or invalid
/// - 403 if the token lacks the permission
/// - Otherwise continues with the `TokenPayload` in request extensions
#[instrument(skip_all, name = "casting.middleware.auth")]
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let payload = gate.auth.check(req.headers(), Some(gate.permission)).await?;

    req.extensions_mut().insert(payload);

    Ok(next.run(req).await)
}

/// Middleware that requires a valid token, without a permission check.
#[instrument(skip_all, name = "casting.middleware.auth")]
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let payload = auth.check(req.headers(), None).await?;

    req.extensions_mut().insert(payload);

    Ok(next.run(req).await)
}

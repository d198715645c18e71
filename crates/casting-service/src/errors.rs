//! Casting service error types.
//!
//! Two layers of errors live here:
//!
//! - [`AuthError`] - failures of the token verification and permission core.
//!   Each variant maps to a stable machine code and an HTTP status through
//!   pure functions, so the mapping is testable without the web layer.
//! - [`ApiError`] - handler-level errors for the CRUD surface, wrapping
//!   `AuthError` so that a single `IntoResponse` renders every failure.
//!
//! Messages returned to clients are fixed strings. Diagnostic detail (parse
//! errors, fetch failures, key ids) is logged server-side only.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "casting-api";

/// Failure of request authentication or authorization.
///
/// Immutable once constructed; propagated unchanged from the step that
/// produced it up to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected")]
    MissingHeader,

    /// `Authorization` header is not of the form `Bearer <token>`.
    #[error("Authorization header must be of the form 'Bearer <token>'")]
    MalformedHeader,

    /// Token structure is broken, its algorithm is unsupported or its header
    /// lacks a key id.
    #[error("Unable to parse authentication token")]
    InvalidToken,

    /// Signature does not match the resolved key.
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Required claims are absent, malformed or carry the wrong issuer/audience.
    #[error("Incorrect claims. Please check the audience and issuer")]
    InvalidClaims,

    /// `exp` has elapsed.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but lacks the required permission.
    #[error("Permission not found")]
    Unauthorized,

    /// No verification key could be resolved for the token's key id.
    #[error("Unable to find the appropriate key")]
    KeyResolution,
}

impl AuthError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader | AuthError::MalformedHeader | AuthError::InvalidToken => {
                "invalid_header"
            }
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::TokenExpired => "token_expired",
            AuthError::Unauthorized => "unauthorized",
            AuthError::KeyResolution => "invalid_token",
        }
    }

    /// HTTP status code for this error.
    ///
    /// - 400 for a malformed `Authorization` header
    /// - 403 for a valid identity lacking the permission
    /// - 401 for every other authentication failure
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedHeader => 400,
            AuthError::Unauthorized => 403,
            AuthError::MissingHeader
            | AuthError::InvalidToken
            | AuthError::InvalidSignature
            | AuthError::InvalidClaims
            | AuthError::TokenExpired
            | AuthError::KeyResolution => 401,
        }
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::UNAUTHORIZED)
    }
}

/// Handler-level error for the casting API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Unprocessable(_) => 422,
            ApiError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetail {
            code: code.to_string(),
            message,
        },
    };

    (status, Json(body)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = error_response(status, self.code(), self.to_string());

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!(
                "Bearer realm=\"{}\", error=\"{}\"",
                AUTH_REALM,
                self.code()
            );
            if let Ok(header_value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, header_value);
            }
        }

        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => err.into_response(),
            ApiError::NotFound(resource) => {
                tracing::debug!(target: "casting.errors", resource = %resource, "Resource not found");
                error_response(
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "Resource Not Found".to_string(),
                )
            }
            ApiError::BadRequest(reason) => {
                tracing::debug!(target: "casting.errors", reason = %reason, "Bad request");
                error_response(
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    "Bad Request".to_string(),
                )
            }
            ApiError::Unprocessable(reason) => {
                tracing::debug!(target: "casting.errors", reason = %reason, "Unprocessable request");
                error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "unprocessable",
                    "Unprocessable".to_string(),
                )
            }
            ApiError::Internal => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error".to_string(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ALL_AUTH_ERRORS: [AuthError; 8] = [
        AuthError::MissingHeader,
        AuthError::MalformedHeader,
        AuthError::InvalidToken,
        AuthError::InvalidSignature,
        AuthError::InvalidClaims,
        AuthError::TokenExpired,
        AuthError::Unauthorized,
        AuthError::KeyResolution,
    ];

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(AuthError::MissingHeader.status_code(), 401);
        assert_eq!(AuthError::MalformedHeader.status_code(), 400);
        assert_eq!(AuthError::InvalidToken.status_code(), 401);
        assert_eq!(AuthError::InvalidSignature.status_code(), 401);
        assert_eq!(AuthError::InvalidClaims.status_code(), 401);
        assert_eq!(AuthError::TokenExpired.status_code(), 401);
        assert_eq!(AuthError::Unauthorized.status_code(), 403);
        assert_eq!(AuthError::KeyResolution.status_code(), 401);
    }

    #[test]
    fn test_auth_error_codes() {
        assert_eq!(AuthError::MissingHeader.code(), "invalid_header");
        assert_eq!(AuthError::MalformedHeader.code(), "invalid_header");
        assert_eq!(AuthError::InvalidToken.code(), "invalid_header");
        assert_eq!(AuthError::InvalidSignature.code(), "invalid_signature");
        assert_eq!(AuthError::InvalidClaims.code(), "invalid_claims");
        assert_eq!(AuthError::TokenExpired.code(), "token_expired");
        assert_eq!(AuthError::Unauthorized.code(), "unauthorized");
        assert_eq!(AuthError::KeyResolution.code(), "invalid_token");
    }

    #[test]
    fn test_auth_status_codes_are_only_400_401_403() {
        for err in ALL_AUTH_ERRORS {
            assert!(
                matches!(err.status_code(), 400 | 401 | 403),
                "{:?} maps to unexpected status {}",
                err,
                err.status_code()
            );
        }
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::from(AuthError::Unauthorized).status_code(), 403);
        assert_eq!(ApiError::NotFound("movie".to_string()).status_code(), 404);
        assert_eq!(ApiError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(ApiError::Unprocessable("x".to_string()).status_code(), 422);
        assert_eq!(ApiError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_unauthorized_renders_403_without_challenge() {
        let response = AuthError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"]["code"], "unauthorized");
        assert_eq!(body_json["error"]["message"], "Permission not found");
    }

    #[tokio::test]
    async fn test_expired_renders_401_with_challenge() {
        let response = AuthError::TokenExpired.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"casting-api\""));
        assert!(www_auth.contains("error=\"token_expired\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "token_expired");
    }

    #[tokio::test]
    async fn test_malformed_header_renders_400() {
        let response = AuthError::MalformedHeader.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "invalid_header");
    }

    #[tokio::test]
    async fn test_api_not_found_uses_generic_message() {
        let response = ApiError::NotFound("movie 42".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"]["message"], "Resource Not Found");
        assert!(!body_json.to_string().contains("movie 42"));
    }

    #[tokio::test]
    async fn test_api_bad_request_hides_reason() {
        let response = ApiError::BadRequest("missing release_date".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "bad_request");
        assert_eq!(body_json["error"]["message"], "Bad Request");
    }

    #[tokio::test]
    async fn test_api_auth_error_delegates_rendering() {
        let response = ApiError::from(AuthError::MissingHeader).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("WWW-Authenticate").is_some());
    }
}

//! Verified token payload and claim validation.
//!
//! Claims are validated after the signature check by a pure function that
//! takes the current time as an argument, so expiry boundaries are testable
//! without wall-clock dependence. The `sub` field is redacted in Debug output.

use crate::errors::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum allowed clock-skew leeway for `exp` (10 minutes).
pub const MAX_LEEWAY_SECONDS: i64 = 600;

/// Decoded claim set of a successfully verified token.
///
/// Request-scoped: created by the verifier, consumed by the permission check
/// and the handler, never persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject (user or client id) - redacted in Debug output.
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audiences, normalized to a list.
    pub aud: Vec<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds), if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Granted permissions. `None` when the token carries no permission claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPayload")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl TokenPayload {
    /// Check if the token grants a specific permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }

    /// Granted permissions, empty when the claim is absent.
    pub fn permissions(&self) -> &[String] {
        self.permissions.as_deref().unwrap_or_default()
    }
}

/// Issuer, audience and leeway a token must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimExpectations {
    /// Required `iss` value.
    pub issuer: String,

    /// Audience that must equal `aud` or be contained in it.
    pub audience: String,

    /// Clock-skew tolerance for `exp`, in seconds.
    pub leeway_seconds: i64,
}

/// Validate claims against the current wall-clock time.
///
/// # Errors
///
/// See [`validate_claims_at`].
pub fn validate_claims(
    claims: &Value,
    expected: &ClaimExpectations,
) -> Result<TokenPayload, AuthError> {
    validate_claims_at(claims, expected, chrono::Utc::now().timestamp())
}

/// Validate claims against an explicit `now` (Unix epoch seconds).
///
/// Structure is checked first, then expiry, then issuer and audience.
///
/// # Errors
///
/// - `AuthError::InvalidClaims` - `iss`, `aud`, `exp` or `permissions` is
///   absent or has the wrong shape, or issuer/audience do not match
/// - `AuthError::TokenExpired` - `now >= exp + leeway`
pub fn validate_claims_at(
    claims: &Value,
    expected: &ClaimExpectations,
    now: i64,
) -> Result<TokenPayload, AuthError> {
    let payload = parse_payload(claims)?;

    if now >= payload.exp.saturating_add(expected.leeway_seconds) {
        tracing::debug!(
            target: "casting.auth.claims",
            exp = payload.exp,
            now = now,
            leeway = expected.leeway_seconds,
            "Token rejected: expired"
        );
        return Err(AuthError::TokenExpired);
    }

    if payload.iss != expected.issuer {
        tracing::debug!(target: "casting.auth.claims", iss = %payload.iss, "Token rejected: issuer mismatch");
        return Err(AuthError::InvalidClaims);
    }

    if !payload.aud.iter().any(|aud| *aud == expected.audience) {
        tracing::debug!(target: "casting.auth.claims", aud = ?payload.aud, "Token rejected: audience mismatch");
        return Err(AuthError::InvalidClaims);
    }

    Ok(payload)
}

fn parse_payload(claims: &Value) -> Result<TokenPayload, AuthError> {
    let obj = claims.as_object().ok_or_else(|| invalid("payload is not an object"))?;

    let iss = obj
        .get("iss")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("iss"))?
        .to_string();

    let aud = match obj.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(values)) => string_array(values).ok_or_else(|| invalid("aud"))?,
        _ => return Err(invalid("aud")),
    };

    let exp = obj
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid("exp"))?;

    let permissions = match obj.get("permissions") {
        Some(Value::Array(values)) => string_array(values).ok_or_else(|| invalid("permissions"))?,
        _ => return Err(invalid("permissions")),
    };

    let sub = optional_string(obj, "sub")?.unwrap_or_default();

    let iat = match obj.get("iat") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| invalid("iat"))?),
    };

    Ok(TokenPayload {
        sub,
        iss,
        aud,
        exp,
        iat,
        permissions: Some(permissions),
    })
}

fn string_array(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|v| v.as_str().map(ToString::to_string))
        .collect()
}

fn optional_string(obj: &Map<String, Value>, name: &'static str) -> Result<Option<String>, AuthError> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(name)),
    }
}

fn invalid(claim: &'static str) -> AuthError {
    tracing::debug!(target: "casting.auth.claims", claim = claim, "Token rejected: missing or malformed claim");
    AuthError::InvalidClaims
}

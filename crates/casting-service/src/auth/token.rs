//! Compact token structure checks.
//!
//! Everything here runs BEFORE any key lookup or cryptographic work:
//!
//! - Tokens are size-checked before parsing
//! - The compact form must have exactly three non-empty segments
//! - The header must be base64url JSON naming an allowed asymmetric algorithm
//!   and a non-empty `kid`
//!
//! The unsigned `none` algorithm is rejected explicitly, whatever the
//! configured allow-list says.

use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use std::str::FromStr;

/// Maximum allowed compact token size in bytes (8KB).
///
/// Typical identity-provider access tokens are 700-1500 bytes. Anything
/// larger than this is rejected before base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Key family a signature algorithm is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA keys (`kty: "RSA"`, `n`/`e` components).
    Rsa,
    /// Octet key pairs (`kty: "OKP"`, `crv: "Ed25519"`, `x` component).
    Okp,
}

/// Returns the key family for an asymmetric algorithm, or `None` for the
/// symmetric (HMAC) and elliptic-curve families this service does not accept.
pub fn key_family(alg: Algorithm) -> Option<KeyFamily> {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Some(KeyFamily::Rsa),
        Algorithm::EdDSA => Some(KeyFamily::Okp),
        _ => None,
    }
}

/// The parts of a token header the verifier needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signature algorithm, already checked against the allow-list.
    pub alg: Algorithm,
    /// Key id used to select the verification key.
    pub kid: String,
}

/// Parse and check the header of a compact token.
///
/// Does NOT verify the signature. The returned `kid` is only fit for a key
/// lookup in a trusted key set.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` when the token is oversized, not three
/// segments, not decodable, declares `none` or a disallowed algorithm, or has
/// no usable `kid`.
pub fn parse_header(token: &str, allowed: &[Algorithm]) -> Result<TokenHeader, AuthError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "casting.auth.token",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(AuthError::InvalidToken);
    }

    // Compact form: header.payload.signature
    let mut segments = token.split('.');
    let (header_part, payload_part, signature_part) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                tracing::debug!(target: "casting.auth.token", "Token rejected: invalid compact format");
                return Err(AuthError::InvalidToken);
            }
        };

    if header_part.is_empty() || payload_part.is_empty() || signature_part.is_empty() {
        tracing::debug!(target: "casting.auth.token", "Token rejected: empty segment");
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "casting.auth.token", error = %e, "Failed to decode token header base64");
        AuthError::InvalidToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "casting.auth.token", error = %e, "Failed to parse token header JSON");
        AuthError::InvalidToken
    })?;

    let alg_name = header
        .get("alg")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            tracing::debug!(target: "casting.auth.token", "Token header has no alg");
            AuthError::InvalidToken
        })?;

    if alg_name.eq_ignore_ascii_case("none") {
        tracing::warn!(target: "casting.auth.token", "Unsigned token rejected");
        return Err(AuthError::InvalidToken);
    }

    let alg = Algorithm::from_str(alg_name)
        .ok()
        .filter(|alg| key_family(*alg).is_some() && allowed.contains(alg))
        .ok_or_else(|| {
            tracing::debug!(target: "casting.auth.token", alg = %alg_name, "Token algorithm not allowed");
            AuthError::InvalidToken
        })?;

    // Extract kid as string, rejecting empty values
    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "casting.auth.token", "Token header has no kid");
            AuthError::InvalidToken
        })?;

    // The signature step re-reads the header into a typed struct; any member
    // it cannot parse (e.g. a non-string `typ`) must fail here as a header error
    jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(target: "casting.auth.token", error = %e, "Token header has malformed members");
        AuthError::InvalidToken
    })?;

    Ok(TokenHeader { alg, kid })
}

//! Token verification.
//!
//! Validates compact tokens against keys published by the identity provider.
//!
//! # Security
//!
//! Verification is strictly ordered so that malformed input never reaches
//! cryptographic work and expired or mis-audienced tokens are never trusted:
//!
//! 1. Size and structure checks, algorithm allow-list (`none` always rejected)
//! 2. Key resolution by `kid`
//! 3. Key/algorithm binding and signature verification
//! 4. Claim structure, expiry, issuer and audience
//!
//! Each step yields exactly one `AuthError`; nothing partially verified is
//! ever returned.

use crate::auth::claims::{validate_claims, ClaimExpectations, TokenPayload};
use crate::auth::jwks::{Jwk, KeyResolver};
use crate::auth::token::{key_family, parse_header, KeyFamily};
use crate::config::Config;
use crate::errors::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Token verifier backed by a key resolver.
pub struct TokenVerifier {
    /// Source of verification keys.
    key_resolver: Arc<dyn KeyResolver>,

    /// Signature algorithms accepted in token headers.
    allowed_algorithms: Vec<Algorithm>,

    /// Issuer, audience and leeway checked after the signature.
    expectations: ClaimExpectations,
}

impl TokenVerifier {
    /// Create a new verifier.
    ///
    /// # Arguments
    ///
    /// * `key_resolver` - Source of verification keys
    /// * `allowed_algorithms` - Accepted header algorithms
    /// * `expectations` - Required issuer/audience and expiry leeway
    pub fn new(
        key_resolver: Arc<dyn KeyResolver>,
        allowed_algorithms: Vec<Algorithm>,
        expectations: ClaimExpectations,
    ) -> Self {
        Self {
            key_resolver,
            allowed_algorithms,
            expectations,
        }
    }

    /// Create a verifier from service configuration.
    pub fn from_config(config: &Config, key_resolver: Arc<dyn KeyResolver>) -> Self {
        Self::new(
            key_resolver,
            config.jwt_algorithms.clone(),
            ClaimExpectations {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                leeway_seconds: config.jwt_leeway_seconds,
            },
        )
    }

    pub fn expectations(&self) -> &ClaimExpectations {
        &self.expectations
    }

    /// Verify a compact token and return its payload.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` - structure, algorithm, `kid` or key binding problems
    /// - `KeyResolution` - no key published for the token's `kid`
    /// - `InvalidSignature` - signature does not match the resolved key
    /// - `InvalidClaims` / `TokenExpired` - claim validation failures
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<TokenPayload, AuthError> {
        // 1. Structure and header (no crypto, no I/O)
        let header = parse_header(token, &self.allowed_algorithms)?;

        // 2. Resolve key material for the declared kid
        let jwk = self.key_resolver.resolve(&header.kid).await?;

        // 3. Check the key fits the algorithm, then verify the signature
        let decoding_key = decoding_key_for(&jwk, header.alg)?;
        let claims = verify_signature(token, &decoding_key, header.alg)?;

        // 4. Claims
        let payload = validate_claims(&claims, &self.expectations)?;

        tracing::debug!(target: "casting.auth.jwt", "Token verified successfully");
        Ok(payload)
    }
}

/// Build a decoding key from a JWK, enforcing that the key belongs to the
/// algorithm family the token declares.
fn decoding_key_for(jwk: &Jwk, alg: Algorithm) -> Result<DecodingKey, AuthError> {
    if let Some(jwk_alg) = &jwk.alg {
        if Algorithm::from_str(jwk_alg).ok() != Some(alg) {
            tracing::warn!(target: "casting.auth.jwt", jwk_alg = %jwk_alg, token_alg = ?alg, "JWK algorithm does not match token");
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "casting.auth.jwt", key_use = %key_use, "JWK is not a signing key");
            return Err(AuthError::InvalidToken);
        }
    }

    match key_family(alg) {
        Some(KeyFamily::Rsa) => {
            if jwk.kty != "RSA" {
                tracing::warn!(target: "casting.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type for RSA algorithm");
                return Err(AuthError::InvalidToken);
            }
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::error!(target: "casting.auth.jwt", "RSA JWK missing n or e");
                return Err(AuthError::InvalidToken);
            };
            DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::error!(target: "casting.auth.jwt", error = %e, "Invalid RSA key components");
                AuthError::InvalidToken
            })
        }
        Some(KeyFamily::Okp) => {
            if jwk.kty != "OKP" || jwk.crv.as_deref() != Some("Ed25519") {
                tracing::warn!(target: "casting.auth.jwt", kty = %jwk.kty, crv = ?jwk.crv, "Unexpected JWK key type for EdDSA");
                return Err(AuthError::InvalidToken);
            }
            let x = jwk.x.as_deref().ok_or_else(|| {
                tracing::error!(target: "casting.auth.jwt", "OKP JWK missing x");
                AuthError::InvalidToken
            })?;
            let public_key = URL_SAFE_NO_PAD.decode(x).map_err(|e| {
                tracing::error!(target: "casting.auth.jwt", error = %e, "Invalid public key encoding");
                AuthError::InvalidToken
            })?;
            Ok(DecodingKey::from_ed_der(&public_key))
        }
        None => Err(AuthError::InvalidToken),
    }
}

/// Verify the signature and return the raw claim set.
///
/// Claim checks in `jsonwebtoken` are switched off; they run afterwards in
/// `validate_claims` so that every claim failure is classified the same way.
fn verify_signature(
    token: &str,
    decoding_key: &DecodingKey,
    alg: Algorithm,
) -> Result<serde_json::Value, AuthError> {
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation.leeway = 0;

    decode::<serde_json::Value>(token, decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::Json(_) | ErrorKind::Utf8(_) => AuthError::InvalidClaims,
                _ => AuthError::InvalidToken,
            }
        })
}

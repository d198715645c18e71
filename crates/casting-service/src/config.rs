//! Casting service configuration.
//!
//! Configuration is loaded from environment variables and validated once at
//! startup. Nothing here is re-read per request.

use crate::auth::claims::MAX_LEEWAY_SECONDS;
use crate::auth::jwks::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MIN_REFRESH_INTERVAL};
use crate::auth::token::key_family;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default JWKS path on the identity-provider domain.
pub const DEFAULT_JWKS_PATH: &str = "/.well-known/jwks.json";

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Casting service configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity-provider domain (host only, e.g. "casting.eu.auth0.com").
    pub auth_domain: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Expected `iss` claim (default: "https://{auth_domain}/").
    pub issuer: String,

    /// Full URL of the JWKS document.
    pub jwks_url: String,

    /// Signature algorithms accepted in token headers (default: RS256).
    pub jwt_algorithms: Vec<Algorithm>,

    /// Clock-skew tolerance for `exp` in seconds (default: 0).
    pub jwt_leeway_seconds: i64,

    /// Optional JWKS cache TTL. `None` means refetch only on key-id miss.
    pub jwks_cache_ttl: Option<Duration>,

    /// Timeout for each JWKS fetch (default: 10s).
    pub jwks_fetch_timeout: Duration,

    /// Minimum gap between key-id-miss refetches (default: 5s).
    pub jwks_min_refresh_interval: Duration,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Graceful-shutdown drain period (default: 0).
    pub drain_period: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_domain", &self.auth_domain)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_algorithms", &self.jwt_algorithms)
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwks_min_refresh_interval", &self.jwks_min_refresh_interval)
            .field("bind_address", &self.bind_address)
            .field("drain_period", &self.drain_period)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid identity-provider domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid URL configuration: {0}")]
    InvalidUrl(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidLeeway(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_domain = required(vars, "AUTH0_DOMAIN")?;
        if auth_domain.contains("://")
            || auth_domain.contains('/')
            || auth_domain.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::InvalidDomain(format!(
                "AUTH0_DOMAIN must be a bare host name, got '{}'",
                auth_domain
            )));
        }

        let audience = required(vars, "API_AUDIENCE")?;

        let issuer = vars
            .get("AUTH_ISSUER")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/", auth_domain));

        let jwks_url = match vars.get("JWKS_URL") {
            Some(url) => url.clone(),
            None => {
                let path = vars
                    .get("JWKS_PATH")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_JWKS_PATH);
                let separator = if path.starts_with('/') { "" } else { "/" };
                format!("https://{}{}{}", auth_domain, separator, path)
            }
        };
        validate_http_url(&jwks_url)?;

        let jwt_algorithms = match vars.get("JWT_ALGORITHMS") {
            Some(value) => parse_algorithms(value)?,
            None => vec![Algorithm::RS256],
        };

        // Parse leeway with validation
        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(0..=MAX_LEEWAY_SECONDS).contains(&value) {
                return Err(ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be between 0 and {}, got {}",
                    MAX_LEEWAY_SECONDS, value
                )));
            }

            value
        } else {
            0
        };

        let jwks_cache_ttl = parse_seconds(vars, "JWKS_CACHE_TTL_SECONDS", false)?;

        let jwks_fetch_timeout = parse_seconds(vars, "JWKS_FETCH_TIMEOUT_SECONDS", false)?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);

        let jwks_min_refresh_interval = parse_seconds(vars, "JWKS_MIN_REFRESH_SECONDS", true)?
            .unwrap_or(DEFAULT_MIN_REFRESH_INTERVAL);

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let drain_period = parse_seconds(vars, "DRAIN_SECONDS", true)?.unwrap_or(Duration::ZERO);

        Ok(Config {
            auth_domain,
            audience,
            issuer,
            jwks_url,
            jwt_algorithms,
            jwt_leeway_seconds,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwks_min_refresh_interval,
            bind_address,
            drain_period,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}' is not a valid URL: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' must be an absolute http(s) URL",
            url
        )));
    }

    Ok(())
}

/// Parse a comma-separated algorithm list. Only asymmetric algorithms with a
/// supported key family are accepted.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name.eq_ignore_ascii_case("none") {
            return Err(ConfigError::InvalidAlgorithm(
                "JWT_ALGORITHMS must not contain 'none'".to_string(),
            ));
        }

        let alg = Algorithm::from_str(name)
            .ok()
            .filter(|alg| key_family(*alg).is_some())
            .ok_or_else(|| {
                ConfigError::InvalidAlgorithm(format!("unsupported algorithm '{}'", name))
            })?;

        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithm(
            "JWT_ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}

/// Parse an optional whole-second duration. Zero is only accepted when
/// `allow_zero` is set.
fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    allow_zero: bool,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(None);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a valid non-negative integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 && !allow_zero {
        return Err(ConfigError::InvalidDuration(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(Some(Duration::from_secs(value)))
}

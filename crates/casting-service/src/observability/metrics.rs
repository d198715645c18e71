//! Metrics definitions for the casting service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `casting_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: parameterized paths (`/movies/{id}`), everything else `/other`
//! - `outcome`: `granted` or `rejected`
//! - `code`: bounded by `AuthError` variants
//! - `status`: `success` or `error`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to render
/// the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("casting_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key set fetches go over the network to the identity provider
        .set_buckets_for_metric(
            Matcher::Prefix("casting_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `casting_http_requests_total`, `casting_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures framework-level rejections (404, 405, JSON parse errors) as well
/// as handler responses.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("casting_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to bound label cardinality.
///
/// Record ids in `/movies/<id>` and `/actors/<id>` become `{id}`.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" | "/me" | "/movies" | "/actors" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');

    match (segments.next(), segments.next(), segments.next()) {
        (Some(collection @ ("movies" | "actors")), Some(id), None) if !id.is_empty() => {
            format!("/{collection}/{{id}}")
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record the outcome of an authorization decision.
///
/// Metric: `casting_auth_decisions_total`
/// Labels: `outcome` (`granted`/`rejected`), `code` (`none` or the error code)
pub fn record_auth_decision(outcome: &str, code: &str) {
    counter!("casting_auth_decisions_total",
        "outcome" => outcome.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record a key set fetch.
///
/// Metric: `casting_jwks_refresh_total`, `casting_jwks_refresh_duration_seconds`
/// Labels: `status` (`success`/`error`)
pub fn record_jwks_refresh(status: &str, duration: Duration) {
    histogram!("casting_jwks_refresh_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

//! Observability for the casting service.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;

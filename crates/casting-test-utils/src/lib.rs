//! # Casting Test Utilities
//!
//! Shared test utilities for the casting service.
//!
//! This crate provides:
//! - Deterministic key fixtures (fixed RSA keys, seeded Ed25519 keys, JWKs)
//! - Token builders (`TestTokenBuilder`)
//! - Role fixtures (`Role`)
//! - Server test harness (`TestCastingServer` with a mock JWKS endpoint)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casting_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestCastingServer::spawn().await?;
//!     let token = server.token_for(Role::ExecutiveProducer);
//!
//!     let response = reqwest::Client::new()
//!         .delete(format!("{}/movies/1", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 404);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod roles;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::{jwks_json, TestKeypair};
pub use roles::Role;
pub use server_harness::*;
pub use token_builders::TestTokenBuilder;

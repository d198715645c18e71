//! Bearer-token authentication and permission checks.
//!
//! - `token` - compact token structure and header checks
//! - `jwks` - key resolution (remote JWKS with caching, or a static set)
//! - `claims` - token payload and claim validation
//! - `jwt` - signature verification tying the above together
//! - `permissions` - permission checks on a verified payload

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod permissions;
pub mod token;

pub use claims::{ClaimExpectations, TokenPayload};
pub use jwks::{Jwk, JwksClient, JwksResponse, KeyResolver, StaticKeySet};
pub use jwt::TokenVerifier;
pub use permissions::authorize;

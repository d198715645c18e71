//! Permission checks against a verified token payload.

use crate::auth::claims::TokenPayload;
use crate::errors::AuthError;

pub const GET_MOVIES: &str = "get:movies";
pub const CREATE_MOVIES: &str = "create:movies";
pub const UPDATE_MOVIES: &str = "update:movies";
pub const DELETE_MOVIES: &str = "delete:movies";
pub const GET_ACTORS: &str = "get:actors";
pub const CREATE_ACTORS: &str = "create:actors";
pub const UPDATE_ACTORS: &str = "update:actors";
pub const DELETE_ACTORS: &str = "delete:actors";

/// Assert that `payload` grants `required`.
///
/// # Errors
///
/// - `AuthError::InvalidClaims` - the payload has no `permissions` claim at all
/// - `AuthError::Unauthorized` - the claim is present but lacks `required`
pub fn authorize(payload: &TokenPayload, required: &str) -> Result<(), AuthError> {
    let granted = payload.permissions.as_deref().ok_or_else(|| {
        tracing::debug!(target: "casting.auth.permissions", "Token carries no permissions claim");
        AuthError::InvalidClaims
    })?;

    if granted.iter().any(|p| p == required) {
        Ok(())
    } else {
        tracing::debug!(
            target: "casting.auth.permissions",
            required = %required,
            "Permission not granted"
        );
        Err(AuthError::Unauthorized)
    }
}

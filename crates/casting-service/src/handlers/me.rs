//! Current caller handler.
//!
//! Returns the identity and permissions carried by the verified token.

use crate::auth::TokenPayload;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Response for `/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub success: bool,

    /// Subject (user or client ID).
    pub sub: String,

    /// Granted permissions, empty if the token carried none.
    pub permissions: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,
}

/// Handler for GET /me
///
/// Requires a valid token via the auth middleware; no specific permission.
#[instrument(skip_all, name = "casting.handlers.me")]
pub async fn get_me(Extension(payload): Extension<TokenPayload>) -> Json<MeResponse> {
    tracing::debug!(target: "casting.handlers.me", "Returning caller claims");

    Json(MeResponse {
        success: true,
        permissions: payload.permissions().to_vec(),
        sub: payload.sub,
        exp: payload.exp,
    })
}

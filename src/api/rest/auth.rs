//! Token endpoint and bearer extractor

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::ApiError;
use crate::api::state::AppState;
use crate::auth::{AuthError, Capability, IssuedToken};

/// Credentials posted to `/auth/token`
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/token - Exchange credentials for a bearer token
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let gate = state.gate.clone();
    let username = request.username.clone();

    // bcrypt verify is CPU-bound
    let result =
        tokio::task::spawn_blocking(move || gate.authenticate(&request.username, &request.password))
            .await?;

    match result {
        Ok(capability) => {
            info!(actor = %capability.actor(), "token issued");
            Ok(Json(state.tokens.issue(&capability)?))
        }
        Err(e) => {
            warn!(username = %username, "login failed");
            Err(e.into())
        }
    }
}

/// Capability recovered from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct Authenticated(pub Capability);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let capability = state.tokens.validate_authorization(header)?;
        Ok(Authenticated(capability))
    }
}

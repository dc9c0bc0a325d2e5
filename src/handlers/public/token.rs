use axum::{extract::State, Form, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::provider::PasswordGrant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /auth/token - OAuth2 password grant
///
/// Form fields `username`, `password` and optionally `client_id` and
/// `client_secret`. Answers in the bare OAuth2 shape rather than the usual
/// envelope so standard clients can use it:
/// ```json
/// {"access_token": "eyJ...", "token_type": "bearer"}
/// ```
pub async fn token(
    State(state): State<AppState>,
    Form(grant): Form<PasswordGrant>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state.provider.password_grant(&grant).await {
        Ok(issued) => {
            info!("Issued token for {}", grant.username);
            Ok(Json(TokenResponse {
                access_token: issued.access_token,
                token_type: "bearer",
            }))
        }
        Err(e) => {
            warn!("Password grant failed for {}: {}", grant.username, e);
            Err(ApiError::unauthorized("Authorization failed"))
        }
    }
}

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{issue_token, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    username: String,
    expires_at: DateTime<Utc>,
}

/// Exchange dashboard credentials for a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let config = state.config();
    let Some(hash) = config.admin_password_hash.as_deref() else {
        tracing::warn!("Login attempted but ADMIN_PASSWORD_HASH is not configured");
        return Err(ApiError::Unauthorized);
    };

    let valid = body.username == config.admin_username && {
        let hash = hash.to_string();
        let password = body.password.clone();
        tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .map_err(|e| ApiError::Internal(format!("password check failed: {e}")))?
    };
    if !valid {
        tracing::info!(username = %body.username, "Rejected dashboard login");
        return Err(ApiError::Unauthorized);
    }

    let (token, expires_at) = issue_token(&config.jwt_secret, &body.username, config.jwt_ttl())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(username = %body.username, "Dashboard login");

    Ok(Json(LoginResponse {
        token,
        username: body.username,
        expires_at,
    }))
}

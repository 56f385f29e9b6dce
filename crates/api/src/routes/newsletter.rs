use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use showcase_core::document::validate::normalize_email;
use showcase_core::document::Subscriber;
use showcase_region::region::UnknownRegion;
use showcase_region::Region;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/newsletter", post(subscribe).get(list_subscribers))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    email: String,
    region: Option<String>,
}

/// Newsletter signup. Signing up twice is not an error.
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<Subscriber>)> {
    let email = normalize_email(&body.email)?;
    let region = body
        .region
        .as_deref()
        .map(|r| r.parse::<Region>())
        .transpose()
        .map_err(|e: UnknownRegion| ApiError::BadRequest(e.to_string()))?
        .map(|r| r.as_str().to_string());

    let upserted = state.store().subscribe(&email, region).await?;
    let status = if upserted.created {
        tracing::info!(id = %upserted.value.id, "Newsletter subscription");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upserted.value)))
}

async fn list_subscribers(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Subscriber>>> {
    Ok(Json(state.store().list_subscribers().await?))
}

use axum::extract::{Query, State};
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use showcase_core::document::validate::normalize_page_path;
use showcase_core::document::PageView;

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/track-page-view", post(track).get(list))
}

#[derive(Debug, Deserialize)]
struct TrackRequest {
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn track(
    State(state): State<AppState>,
    Json(body): Json<TrackRequest>,
) -> ApiResult<Json<PageView>> {
    let path = normalize_page_path(&body.path)?;
    Ok(Json(state.store().record_page_view(&path).await?))
}

/// Most viewed pages first.
async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PageView>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(Json(state.store().list_page_views(limit).await?))
}

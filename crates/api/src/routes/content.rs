use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use showcase_core::document::validate::{validate_content_type, validate_new_content};
use showcase_core::document::{ContentDocument, ContentQuery, ContentUpdate, NewContent};
use showcase_core::events::ChangeAction;
use showcase_core::ShowcaseEvent;
use showcase_region::filter_document;
use uuid::Uuid;

use super::region::{audience, RegionQuery};
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ClientIp;
use crate::state::AppState;

/// Generic page content routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/content", get(list_content).post(create_content))
        .route(
            "/api/content/item/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route(
            "/api/content/{content_type}",
            get(get_by_type).put(upsert_by_type).delete(delete_by_type),
        )
}

async fn list_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Json<Vec<ContentDocument>>> {
    if let Some(content_type) = &query.content_type {
        validate_content_type(content_type)?;
    }
    Ok(Json(state.store().list_content(&query).await?))
}

/// The page document for `content_type`, with tagged sections narrowed to the
/// caller's region.
async fn get_by_type(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    ClientIp(ip): ClientIp,
    Query(query): Query<RegionQuery>,
) -> ApiResult<Json<ContentDocument>> {
    validate_content_type(&content_type)?;
    let mut doc = state
        .content_by_type(&content_type)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no active `{content_type}` content")))?;

    if let Some(region) = audience(&state, query.region.as_deref(), ip).await? {
        filter_document(&mut doc.content, region);
    }
    Ok(Json(doc))
}

async fn create_content(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(new): Json<NewContent>,
) -> ApiResult<(StatusCode, Json<ContentDocument>)> {
    validate_new_content(&new)?;
    let doc = state.store().create_content(new).await?;
    tracing::info!(user = %admin.username, id = %doc.id, content_type = %doc.content_type, "Content created");
    state
        .notify(ShowcaseEvent::content(&doc.content_type, Some(doc.id), ChangeAction::Created))
        .await;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Dashboard save: overwrite the page document of `content_type` wholesale.
async fn upsert_by_type(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Json(mut new): Json<NewContent>,
) -> ApiResult<(StatusCode, Json<ContentDocument>)> {
    new.content_type = content_type;
    validate_new_content(&new)?;

    let upserted = state.store().upsert_by_type(new).await?;
    let doc = upserted.value;
    let (status, action) = if upserted.created {
        (StatusCode::CREATED, ChangeAction::Created)
    } else {
        (StatusCode::OK, ChangeAction::Updated)
    };
    tracing::info!(user = %admin.username, id = %doc.id, content_type = %doc.content_type, ?action, "Content saved");
    state
        .notify(ShowcaseEvent::content(&doc.content_type, Some(doc.id), action))
        .await;
    Ok((status, Json(doc)))
}

async fn delete_by_type(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(content_type): Path<String>,
) -> ApiResult<Json<Value>> {
    validate_content_type(&content_type)?;
    let deleted = state.store().delete_by_type(&content_type).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("no `{content_type}` content")));
    }
    tracing::info!(user = %admin.username, %content_type, deleted, "Content deleted");
    state
        .notify(ShowcaseEvent::content(&content_type, None, ChangeAction::Deleted))
        .await;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ContentDocument>> {
    state
        .store()
        .get_content(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("content {id}")))
}

async fn update_item(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ContentUpdate>,
) -> ApiResult<Json<ContentDocument>> {
    let doc = state
        .store()
        .update_content(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("content {id}")))?;
    tracing::info!(user = %admin.username, %id, "Content updated");
    state
        .notify(ShowcaseEvent::content(&doc.content_type, Some(doc.id), ChangeAction::Updated))
        .await;
    Ok(Json(doc))
}

async fn delete_item(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let doc = state
        .store()
        .delete_content(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("content {id}")))?;
    tracing::info!(user = %admin.username, %id, "Content deleted");
    state
        .notify(ShowcaseEvent::content(&doc.content_type, Some(doc.id), ChangeAction::Deleted))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

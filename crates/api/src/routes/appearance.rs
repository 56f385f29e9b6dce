use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use showcase_core::document::validate::{validate_theme, ValidationError};
use showcase_core::document::{NewTheme, Theme, ThemeUpdate};
use showcase_core::events::ChangeAction;
use showcase_core::ShowcaseEvent;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Site theme routes. At most one theme is active at any time.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/appearance", get(active_theme).post(create_theme))
        .route("/api/appearance/themes", get(list_themes))
        .route("/api/appearance/{id}", put(update_theme).delete(delete_theme))
        .route("/api/appearance/{id}/activate", post(activate_theme))
}

async fn active_theme(State(state): State<AppState>) -> ApiResult<Json<Theme>> {
    state
        .store()
        .active_theme()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no active theme".to_string()))
}

async fn list_themes(State(state): State<AppState>) -> ApiResult<Json<Vec<Theme>>> {
    Ok(Json(state.store().list_themes().await?))
}

async fn create_theme(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(new): Json<NewTheme>,
) -> ApiResult<(StatusCode, Json<Theme>)> {
    validate_theme(&new.settings)?;
    let theme = state.store().create_theme(new).await?;
    tracing::info!(user = %admin.username, id = %theme.id, active = theme.is_active, "Theme created");
    state
        .notify(ShowcaseEvent::theme(theme.id, ChangeAction::Created, theme.is_active))
        .await;
    Ok((StatusCode::CREATED, Json(theme)))
}

async fn update_theme(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ThemeUpdate>,
) -> ApiResult<Json<Theme>> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ValidationError::EmptyThemeName.into());
    }
    let activates = update.activates();
    let theme = state
        .store()
        .update_theme(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("theme {id}")))?;
    tracing::info!(user = %admin.username, %id, activates, "Theme updated");
    state
        .notify(ShowcaseEvent::theme(theme.id, ChangeAction::Updated, activates))
        .await;
    Ok(Json(theme))
}

async fn activate_theme(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Theme>> {
    let theme = state
        .store()
        .activate_theme(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("theme {id}")))?;
    tracing::info!(user = %admin.username, %id, "Theme activated");
    state
        .notify(ShowcaseEvent::theme(theme.id, ChangeAction::Updated, true))
        .await;
    Ok(Json(theme))
}

async fn delete_theme(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store().delete_theme(id).await? {
        return Err(ApiError::NotFound(format!("theme {id}")));
    }
    tracing::info!(user = %admin.username, %id, "Theme deleted");
    state
        .notify(ShowcaseEvent::theme(id, ChangeAction::Deleted, false))
        .await;
    Ok(StatusCode::NO_CONTENT)
}

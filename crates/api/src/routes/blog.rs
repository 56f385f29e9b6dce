use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use showcase_core::document::kinds::BLOG_POST;
use showcase_core::document::{ContentDocument, ContentQuery};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_LIMIT: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/blog", get(list_posts))
        .route("/api/blog/{slug}", get(get_post))
}

#[derive(Debug, Default, Deserialize)]
struct BlogQuery {
    tag: Option<String>,
    limit: Option<usize>,
}

fn has_tag(doc: &ContentDocument, tag: &str) -> bool {
    doc.content
        .get("tags")
        .and_then(Value::as_array)
        .is_some_and(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .any(|t| t.eq_ignore_ascii_case(tag))
        })
}

/// Published posts, newest first.
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> ApiResult<Json<Vec<ContentDocument>>> {
    let mut posts = state
        .store()
        .list_content(&ContentQuery::active_of_type(BLOG_POST))
        .await?;
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        posts.retain(|p| has_tag(p, tag));
    }
    posts.truncate(query.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT));
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ContentDocument>> {
    state
        .store()
        .list_content(&ContentQuery::active_of_type(BLOG_POST))
        .await?
        .into_iter()
        .find(|p| p.content.get("slug").and_then(Value::as_str) == Some(slug.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("blog post `{slug}`")))
}

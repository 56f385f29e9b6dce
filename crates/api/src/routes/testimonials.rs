use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use showcase_core::document::kinds::TESTIMONIAL;
use showcase_core::document::references::select_by_ids;
use showcase_core::document::ContentQuery;
use showcase_region::filter_items_by;

use super::region::audience;
use crate::error::ApiResult;
use crate::extract::ClientIp;
use crate::state::AppState;

/// Lists the ids from `?ids=` that matched no active testimonial.
pub const MISSING_HEADER: &str = "x-missing-testimonials";

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/testimonials", get(list_testimonials))
}

#[derive(Debug, Default, Deserialize)]
struct TestimonialQuery {
    region: Option<String>,
    /// Comma-separated document ids, returned in this order.
    ids: Option<String>,
}

async fn list_testimonials(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<TestimonialQuery>,
) -> ApiResult<Response> {
    let mut docs = state
        .store()
        .list_content(&ContentQuery::active_of_type(TESTIMONIAL))
        .await?;

    let mut missing = Vec::new();
    if let Some(ids) = query.ids.as_deref() {
        let ids: Vec<&str> = ids.split(',').collect();
        let selection = select_by_ids(&docs, ids.as_slice());
        docs = selection.found;
        missing = selection.missing;
    }

    if let Some(region) = audience(&state, query.region.as_deref(), ip).await? {
        docs = filter_items_by(docs, region, |doc| &doc.content);
    }

    let mut response = Json(docs).into_response();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Selected testimonials not found");
        if let Ok(value) = HeaderValue::from_str(&missing.join(",")) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(MISSING_HEADER), value);
        }
    }
    Ok(response)
}

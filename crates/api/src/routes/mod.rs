pub mod appearance;
pub mod auth;
pub mod blog;
pub mod content;
pub mod events;
pub mod health;
pub mod newsletter;
pub mod page_views;
pub mod region;
pub mod testimonials;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(content::routes())
        .merge(appearance::routes())
        .merge(testimonials::routes())
        .merge(blog::routes())
        .merge(newsletter::routes())
        .merge(page_views::routes())
        .merge(region::routes())
        .merge(events::routes())
        .with_state(state)
}

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{routing::get, Router};
use futures::stream::{self, Stream, StreamExt};
use showcase_core::ShowcaseEvent;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/events", get(listen))
}

fn to_sse(event: &ShowcaseEvent) -> Option<Event> {
    let name = match event {
        ShowcaseEvent::Welcome => "welcome",
        ShowcaseEvent::ContentChanged(_) => "content",
        ShowcaseEvent::ThemeChanged(_) => "theme",
    };
    match Event::default().event(name).json_data(event) {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::warn!("Failed to encode event: {err}");
            None
        }
    }
}

/// Server-sent stream of content and theme changes.
async fn listen(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_bus().subscribe();
    tracing::debug!(subscribers = state.event_bus().subscriber_count(), "Event listener connected");

    let welcome = stream::iter(to_sse(&ShowcaseEvent::Welcome));
    let changes = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse(&event) {
                        return Some((sse, rx));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event listener lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(welcome.chain(changes).map(Ok)).keep_alive(KeepAlive::default())
}

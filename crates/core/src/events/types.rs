use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted after successful writes, consumed by the cache and SSE listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShowcaseEvent {
    Welcome,
    ContentChanged(ContentChange),
    ThemeChanged(ThemeChange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub content_type: String,
    pub document_id: Option<Uuid>,
    pub action: ChangeAction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeChange {
    pub theme_id: Uuid,
    pub action: ChangeAction,
    pub activated: bool,
    pub timestamp: DateTime<Utc>,
}

impl ShowcaseEvent {
    pub fn content(content_type: impl Into<String>, document_id: Option<Uuid>, action: ChangeAction) -> Self {
        ShowcaseEvent::ContentChanged(ContentChange {
            content_type: content_type.into(),
            document_id,
            action,
            timestamp: Utc::now(),
        })
    }

    pub fn theme(theme_id: Uuid, action: ChangeAction, activated: bool) -> Self {
        ShowcaseEvent::ThemeChanged(ThemeChange {
            theme_id,
            action,
            activated,
            timestamp: Utc::now(),
        })
    }
}

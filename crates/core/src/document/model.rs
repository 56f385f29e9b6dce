use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A page content document. Every page of the site is one of these,
/// discriminated by `type`; `content` has no fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub content: Value,
    pub metadata: Metadata,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Presentation hints attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Body of a create or wholesale replace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object")]
    pub content: Value,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewContent {
    pub fn new(content_type: impl Into<String>, content: Value) -> Self {
        Self {
            content_type: content_type.into(),
            title: String::new(),
            description: String::new(),
            content,
            metadata: Metadata::default(),
            is_active: true,
        }
    }

    /// Build the stored document for a fresh insert.
    pub fn into_document(self, now: DateTime<Utc>) -> ContentDocument {
        ContentDocument {
            id: Uuid::now_v7(),
            content_type: self.content_type,
            title: self.title,
            description: self.description,
            content: normalize_content(self.content),
            metadata: self.metadata,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a single document; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<Value>,
    pub metadata: Option<Metadata>,
    pub is_active: Option<bool>,
}

impl ContentUpdate {
    pub fn apply(self, doc: &mut ContentDocument, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            doc.title = title;
        }
        if let Some(description) = self.description {
            doc.description = description;
        }
        if let Some(content) = self.content {
            doc.content = normalize_content(content);
        }
        if let Some(metadata) = self.metadata {
            doc.metadata = metadata;
        }
        if let Some(is_active) = self.is_active {
            doc.is_active = is_active;
        }
        doc.updated_at = now;
    }
}

/// Listing filter for content documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub active: Option<bool>,
}

impl ContentQuery {
    pub fn active_of_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            active: Some(true),
        }
    }

    pub fn matches(&self, doc: &ContentDocument) -> bool {
        self.content_type
            .as_deref()
            .is_none_or(|t| t == doc.content_type)
            && self.active.is_none_or(|a| a == doc.is_active)
    }
}

/// Per-path view counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub path: String,
    pub count: i64,
}

/// CSS-variable values of a site theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeSettings {
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
    pub heading_font: String,
    pub body_font: String,
    pub border_radius: String,
    pub spacing: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            primary_color: "#1e3a8a".to_string(),
            secondary_color: "#0f766e".to_string(),
            accent_color: "#f59e0b".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#111827".to_string(),
            heading_font: "Poppins, sans-serif".to_string(),
            body_font: "Inter, sans-serif".to_string(),
            border_radius: "0.5rem".to_string(),
            spacing: "1rem".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub settings: ThemeSettings,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTheme {
    #[serde(flatten)]
    pub settings: ThemeSettings,
    #[serde(default)]
    pub is_active: bool,
}

/// Partial theme edit. `is_active: Some(true)` activates the theme; `Some(false)`
/// is ignored because deactivating would leave the site without a theme.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeUpdate {
    pub name: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub accent_color: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub heading_font: Option<String>,
    pub body_font: Option<String>,
    pub border_radius: Option<String>,
    pub spacing: Option<String>,
    pub is_active: Option<bool>,
}

impl ThemeUpdate {
    pub fn apply(&self, settings: &mut ThemeSettings) {
        let fields = [
            (&self.name, &mut settings.name),
            (&self.primary_color, &mut settings.primary_color),
            (&self.secondary_color, &mut settings.secondary_color),
            (&self.accent_color, &mut settings.accent_color),
            (&self.background_color, &mut settings.background_color),
            (&self.text_color, &mut settings.text_color),
            (&self.heading_font, &mut settings.heading_font),
            (&self.body_font, &mut settings.body_font),
            (&self.border_radius, &mut settings.border_radius),
            (&self.spacing, &mut settings.spacing),
        ];
        for (update, field) in fields {
            if let Some(value) = update {
                *field = value.clone();
            }
        }
    }

    pub fn activates(&self) -> bool {
        self.is_active == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn default_true() -> bool {
    true
}

/// `null` content is stored as an empty object.
fn normalize_content(content: Value) -> Value {
    if content.is_null() {
        empty_object()
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_content_defaults() {
        let new: NewContent = serde_json::from_value(json!({"type": "home-page"})).unwrap();
        assert!(new.is_active);
        assert_eq!(new.content, json!({}));
        assert_eq!(new.metadata, Metadata::default());
    }

    #[test]
    fn document_serializes_with_wire_names() {
        let doc = NewContent::new("faq", json!({"items": []})).into_document(Utc::now());
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["type"], "faq");
        assert_eq!(v["isActive"], true);
        assert!(v.get("_id").is_some());
        assert!(v.get("createdAt").is_some());
        assert_eq!(v["metadata"], json!({}));
    }

    #[test]
    fn content_update_only_touches_given_fields() {
        let created = Utc::now();
        let mut doc = NewContent::new("home-page", json!({"hero": {}})).into_document(created);
        doc.title = "Home".into();
        let update = ContentUpdate {
            is_active: Some(false),
            content: Some(Value::Null),
            ..Default::default()
        };
        let later = created + chrono::Duration::seconds(5);
        update.apply(&mut doc, later);
        assert_eq!(doc.title, "Home");
        assert!(!doc.is_active);
        assert_eq!(doc.content, json!({}));
        assert_eq!(doc.updated_at, later);
        assert_eq!(doc.created_at, created);
    }

    #[test]
    fn theme_settings_fill_missing_fields() {
        let new: NewTheme =
            serde_json::from_value(json!({"name": "Dark", "backgroundColor": "#000"})).unwrap();
        assert_eq!(new.settings.name, "Dark");
        assert_eq!(new.settings.background_color, "#000");
        assert_eq!(new.settings.body_font, ThemeSettings::default().body_font);
        assert!(!new.is_active);
    }

    #[test]
    fn theme_update_applies_present_fields() {
        let mut settings = ThemeSettings::default();
        let update = ThemeUpdate {
            accent_color: Some("#ff0000".into()),
            is_active: Some(true),
            ..Default::default()
        };
        update.apply(&mut settings);
        assert_eq!(settings.accent_color, "#ff0000");
        assert_eq!(settings.name, "Default");
        assert!(update.activates());
    }

    #[test]
    fn query_matches_type_and_state() {
        let doc = NewContent::new("testimonial", json!({})).into_document(Utc::now());
        assert!(ContentQuery::active_of_type("testimonial").matches(&doc));
        assert!(!ContentQuery::active_of_type("blog-post").matches(&doc));
        assert!(ContentQuery::default().matches(&doc));
    }
}

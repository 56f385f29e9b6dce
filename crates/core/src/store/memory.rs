use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, StoreResult, Upserted};
use crate::document::{
    ContentDocument, ContentQuery, ContentUpdate, NewContent, NewTheme, PageView, Subscriber,
    Theme, ThemeUpdate,
};

#[derive(Default)]
struct State {
    contents: Vec<ContentDocument>,
    page_views: HashMap<String, i64>,
    themes: Vec<Theme>,
    subscribers: Vec<Subscriber>,
}

/// In-process store. Every operation runs under a single lock, so the same
/// atomicity the SQL statements give holds here too.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

fn sort_documents(docs: &mut [ContentDocument]) {
    docs.sort_by_key(|d| (d.metadata.order.is_none(), d.metadata.order, Reverse(d.created_at)));
}

fn latest_of_type<'a>(
    docs: impl Iterator<Item = &'a mut ContentDocument>,
    content_type: &str,
) -> Option<&'a mut ContentDocument> {
    docs.filter(|d| d.content_type == content_type)
        .max_by_key(|d| d.updated_at)
}

fn set_active(themes: &mut [Theme], id: Uuid) -> Option<Theme> {
    if !themes.iter().any(|t| t.id == id) {
        return None;
    }
    let now = Utc::now();
    let mut activated = None;
    for theme in themes.iter_mut() {
        let active = theme.id == id;
        if theme.is_active != active {
            theme.is_active = active;
            theme.updated_at = now;
        }
        if active {
            activated = Some(theme.clone());
        }
    }
    activated
}

impl MemoryStore {
    pub async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    pub async fn list_content(&self, query: &ContentQuery) -> StoreResult<Vec<ContentDocument>> {
        let state = self.state.read().await;
        let mut docs: Vec<ContentDocument> = state
            .contents
            .iter()
            .filter(|d| query.matches(d))
            .cloned()
            .collect();
        sort_documents(&mut docs);
        Ok(docs)
    }

    pub async fn find_by_type(&self, content_type: &str) -> StoreResult<Option<ContentDocument>> {
        let state = self.state.read().await;
        Ok(state
            .contents
            .iter()
            .filter(|d| d.content_type == content_type && d.is_active)
            .max_by_key(|d| d.updated_at)
            .cloned())
    }

    pub async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        let state = self.state.read().await;
        Ok(state.contents.iter().find(|d| d.id == id).cloned())
    }

    pub async fn create_content(&self, new: NewContent) -> StoreResult<ContentDocument> {
        let doc = new.into_document(Utc::now());
        self.state.write().await.contents.push(doc.clone());
        Ok(doc)
    }

    pub async fn upsert_by_type(&self, new: NewContent) -> StoreResult<Upserted<ContentDocument>> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        if let Some(existing) = latest_of_type(state.contents.iter_mut(), &new.content_type) {
            let update = ContentUpdate {
                title: Some(new.title),
                description: Some(new.description),
                content: Some(new.content),
                metadata: Some(new.metadata),
                is_active: Some(new.is_active),
            };
            update.apply(existing, now);
            return Ok(Upserted {
                value: existing.clone(),
                created: false,
            });
        }
        let doc = new.into_document(now);
        state.contents.push(doc.clone());
        Ok(Upserted {
            value: doc,
            created: true,
        })
    }

    pub async fn update_content(
        &self,
        id: Uuid,
        update: ContentUpdate,
    ) -> StoreResult<Option<ContentDocument>> {
        let mut state = self.state.write().await;
        Ok(state.contents.iter_mut().find(|d| d.id == id).map(|doc| {
            update.apply(doc, Utc::now());
            doc.clone()
        }))
    }

    pub async fn delete_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        let mut state = self.state.write().await;
        let pos = state.contents.iter().position(|d| d.id == id);
        Ok(pos.map(|i| state.contents.remove(i)))
    }

    pub async fn delete_by_type(&self, content_type: &str) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.contents.len();
        state.contents.retain(|d| d.content_type != content_type);
        Ok((before - state.contents.len()) as u64)
    }

    pub async fn replace_type(
        &self,
        content_type: &str,
        docs: Vec<NewContent>,
    ) -> StoreResult<Vec<ContentDocument>> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.contents.retain(|d| d.content_type != content_type);
        let inserted: Vec<ContentDocument> = docs
            .into_iter()
            .map(|mut new| {
                new.content_type = content_type.to_string();
                new.into_document(now)
            })
            .collect();
        state.contents.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    pub async fn record_page_view(&self, path: &str) -> StoreResult<PageView> {
        let mut state = self.state.write().await;
        let count = state.page_views.entry(path.to_string()).or_insert(0);
        *count += 1;
        Ok(PageView {
            path: path.to_string(),
            count: *count,
        })
    }

    pub async fn list_page_views(&self, limit: i64) -> StoreResult<Vec<PageView>> {
        let state = self.state.read().await;
        let mut views: Vec<PageView> = state
            .page_views
            .iter()
            .map(|(path, count)| PageView {
                path: path.clone(),
                count: *count,
            })
            .collect();
        views.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        views.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(views)
    }

    pub async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        let state = self.state.read().await;
        let mut themes = state.themes.clone();
        themes.sort_by_key(|t| t.created_at);
        Ok(themes)
    }

    pub async fn active_theme(&self) -> StoreResult<Option<Theme>> {
        let state = self.state.read().await;
        Ok(state.themes.iter().find(|t| t.is_active).cloned())
    }

    pub async fn get_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        let state = self.state.read().await;
        Ok(state.themes.iter().find(|t| t.id == id).cloned())
    }

    pub async fn create_theme(&self, new: NewTheme) -> StoreResult<Theme> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let theme = Theme {
            id: Uuid::now_v7(),
            settings: new.settings,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        let id = theme.id;
        state.themes.push(theme.clone());
        if new.is_active {
            if let Some(active) = set_active(&mut state.themes, id) {
                return Ok(active);
            }
        }
        Ok(theme)
    }

    pub async fn update_theme(&self, id: Uuid, update: ThemeUpdate) -> StoreResult<Option<Theme>> {
        let mut state = self.state.write().await;
        let Some(theme) = state.themes.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        update.apply(&mut theme.settings);
        theme.updated_at = Utc::now();
        let updated = theme.clone();
        if update.activates() {
            return Ok(set_active(&mut state.themes, id));
        }
        Ok(Some(updated))
    }

    pub async fn activate_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        let mut state = self.state.write().await;
        Ok(set_active(&mut state.themes, id))
    }

    pub async fn delete_theme(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.themes.iter().position(|t| t.id == id) {
            Some(i) if state.themes[i].is_active => Err(StoreError::Conflict(
                "cannot delete the active theme".to_string(),
            )),
            Some(i) => {
                state.themes.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn subscribe(
        &self,
        email: &str,
        region: Option<String>,
    ) -> StoreResult<Upserted<Subscriber>> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.subscribers.iter().find(|s| s.email == email) {
            return Ok(Upserted {
                value: existing.clone(),
                created: false,
            });
        }
        let subscriber = Subscriber {
            id: Uuid::now_v7(),
            email: email.to_string(),
            region,
            created_at: Utc::now(),
        };
        state.subscribers.push(subscriber.clone());
        Ok(Upserted {
            value: subscriber,
            created: true,
        })
    }

    pub async fn list_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let state = self.state.read().await;
        let mut subscribers = state.subscribers.clone();
        subscribers.sort_by_key(|s| Reverse(s.created_at));
        Ok(subscribers)
    }
}

//! Persistence for content documents, page views, themes and newsletter
//! subscribers.
//!
//! [`Store`] dispatches to PostgreSQL in production and to an in-process
//! store when no database is configured (local development and tests).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use uuid::Uuid;

use crate::document::{
    ContentDocument, ContentQuery, ContentUpdate, NewContent, NewTheme, PageView, Subscriber,
    Theme, ThemeUpdate,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of an insert-or-update.
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub value: T,
    pub created: bool,
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Store::Postgres($store) => $call.await,
            Store::Memory($store) => $call.await,
        }
    };
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::default())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    /// Check the backend is reachable.
    pub async fn ping(&self) -> StoreResult<()> {
        dispatch!(self, s => s.ping())
    }

    /// Documents matching `query`, ordered by `metadata.order` (unset last) then newest first.
    pub async fn list_content(&self, query: &ContentQuery) -> StoreResult<Vec<ContentDocument>> {
        dispatch!(self, s => s.list_content(query))
    }

    /// Most recently updated active document of `content_type`.
    pub async fn find_by_type(&self, content_type: &str) -> StoreResult<Option<ContentDocument>> {
        dispatch!(self, s => s.find_by_type(content_type))
    }

    pub async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        dispatch!(self, s => s.get_content(id))
    }

    pub async fn create_content(&self, new: NewContent) -> StoreResult<ContentDocument> {
        dispatch!(self, s => s.create_content(new))
    }

    /// Overwrite the most recent document of `new.content_type`, or insert one.
    pub async fn upsert_by_type(&self, new: NewContent) -> StoreResult<Upserted<ContentDocument>> {
        dispatch!(self, s => s.upsert_by_type(new))
    }

    pub async fn update_content(
        &self,
        id: Uuid,
        update: ContentUpdate,
    ) -> StoreResult<Option<ContentDocument>> {
        dispatch!(self, s => s.update_content(id, update))
    }

    pub async fn delete_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        dispatch!(self, s => s.delete_content(id))
    }

    pub async fn delete_by_type(&self, content_type: &str) -> StoreResult<u64> {
        dispatch!(self, s => s.delete_by_type(content_type))
    }

    /// Delete every document of `content_type` and insert `docs` in its place,
    /// all or nothing.
    pub async fn replace_type(
        &self,
        content_type: &str,
        docs: Vec<NewContent>,
    ) -> StoreResult<Vec<ContentDocument>> {
        dispatch!(self, s => s.replace_type(content_type, docs))
    }

    /// Atomically add one view to `path`, creating the counter at 1.
    pub async fn record_page_view(&self, path: &str) -> StoreResult<PageView> {
        dispatch!(self, s => s.record_page_view(path))
    }

    /// Most viewed first.
    pub async fn list_page_views(&self, limit: i64) -> StoreResult<Vec<PageView>> {
        dispatch!(self, s => s.list_page_views(limit))
    }

    pub async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        dispatch!(self, s => s.list_themes())
    }

    pub async fn active_theme(&self) -> StoreResult<Option<Theme>> {
        dispatch!(self, s => s.active_theme())
    }

    pub async fn get_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        dispatch!(self, s => s.get_theme(id))
    }

    /// Insert a theme; `is_active` activates it in the same transaction.
    pub async fn create_theme(&self, new: NewTheme) -> StoreResult<Theme> {
        dispatch!(self, s => s.create_theme(new))
    }

    pub async fn update_theme(&self, id: Uuid, update: ThemeUpdate) -> StoreResult<Option<Theme>> {
        dispatch!(self, s => s.update_theme(id, update))
    }

    /// Make `id` the only active theme.
    pub async fn activate_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        dispatch!(self, s => s.activate_theme(id))
    }

    /// Delete an inactive theme. Deleting the active theme is a conflict.
    pub async fn delete_theme(&self, id: Uuid) -> StoreResult<bool> {
        dispatch!(self, s => s.delete_theme(id))
    }

    /// Subscribe a normalized email; existing subscriptions are returned as-is.
    pub async fn subscribe(
        &self,
        email: &str,
        region: Option<String>,
    ) -> StoreResult<Upserted<Subscriber>> {
        dispatch!(self, s => s.subscribe(email, region))
    }

    pub async fn list_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        dispatch!(self, s => s.list_subscribers())
    }
}

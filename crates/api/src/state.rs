use std::net::IpAddr;
use std::sync::Arc;

use showcase_core::document::ContentDocument;
use showcase_core::{EventBus, ShowcaseEvent, Store, StoreResult, TtlCache};
use showcase_region::{GeoResolver, Resolution, Source};

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: Store,
    config: AppConfig,
    event_bus: EventBus,
    resolver: GeoResolver,
    content_cache: TtlCache<String, ContentDocument>,
    region_cache: TtlCache<IpAddr, Resolution>,
}

impl AppState {
    pub fn new(store: Store, config: AppConfig, event_bus: EventBus) -> Result<Self, reqwest::Error> {
        let resolver = GeoResolver::new(config.resolver_config())?;
        Ok(Self {
            inner: Arc::new(InnerState {
                content_cache: TtlCache::new(config.content_cache_ttl()),
                region_cache: TtlCache::new(config.region_cache_ttl()),
                store,
                config,
                event_bus,
                resolver,
            }),
        })
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Active document of `content_type`, served from the content cache while fresh.
    pub async fn content_by_type(&self, content_type: &str) -> StoreResult<Option<ContentDocument>> {
        if let Some(doc) = self.inner.content_cache.get(content_type).await {
            return Ok(Some(doc));
        }
        let seen = self.inner.content_cache.generation(content_type).await;
        let doc = self.inner.store.find_by_type(content_type).await?;
        if let Some(doc) = &doc {
            let stored = self
                .inner
                .content_cache
                .insert_if_unchanged(content_type.to_string(), doc.clone(), seen)
                .await;
            if !stored {
                tracing::debug!(%content_type, "fetched content not cached");
            }
        }
        Ok(doc)
    }

    /// Region for a client address. Lookups and fallbacks are remembered per IP.
    pub async fn resolve_region(&self, ip: Option<IpAddr>) -> Resolution {
        if let Some(ip) = ip {
            if let Some(mut cached) = self.inner.region_cache.get(&ip).await {
                cached.source = Source::Cache;
                return cached;
            }
        }
        let resolution = self.inner.resolver.resolve(ip).await;
        if let (Some(ip), Source::Lookup | Source::Fallback) = (ip, resolution.source) {
            self.inner.region_cache.insert(ip, resolution.clone()).await;
        }
        resolution
    }

    /// Record a write: drop stale cache entries, then publish to listeners.
    pub async fn notify(&self, event: ShowcaseEvent) {
        if let ShowcaseEvent::ContentChanged(change) = &event {
            self.inner
                .content_cache
                .invalidate(change.content_type.as_str())
                .await;
        }
        let receivers = self.inner.event_bus.publish(event);
        tracing::debug!(receivers, "event published");
    }

    /// Drop expired cache entries.
    pub async fn purge_caches(&self) {
        let content = self.inner.content_cache.purge_expired().await;
        let regions = self.inner.region_cache.purge_expired().await;
        if content + regions > 0 {
            tracing::debug!(content, regions, "purged expired cache entries");
        }
    }
}

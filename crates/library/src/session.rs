//! Per-client orchestration of entries, resolution, cache and publication.

use crate::entries::EntriesHandle;
use crate::error::{ErrorKind, Result};
use crate::group::{Artist, group_by_artist, sort_media};
use crate::preload::{self, DEFAULT_STAGGER, PreloadReport};
use crate::publish::{Channel, DEFAULT_CAPACITY, Published, Subscription};
use crate::resolve::Resolver;
use exn::ResultExt;
use jukebox_asyncutils::InFlight;
use jukebox_cache::CategoryCache;
use jukebox_catalog::models::{Category, ClientId, RawMediaEntry, ResolvedItem};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::instrument;

pub type ArtistView = Published<Vec<Artist>>;
pub type MediaView = Published<Vec<ResolvedItem>>;
/// Background sweep started by an entry change; `None` if another sweep was
/// already running.
pub type PreloadHandle = JoinHandle<Option<PreloadReport>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub preload_stagger: Duration,
    pub channel_capacity: usize,
}
impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preload_stagger: DEFAULT_STAGGER,
            channel_capacity: DEFAULT_CAPACITY,
        }
    }
}

struct Inner {
    client: ClientId,
    source: EntriesHandle,
    resolver: Resolver,
    cache: Arc<CategoryCache>,
    options: SessionOptions,
    entries: RwLock<Option<Arc<Vec<RawMediaEntry>>>>,
    category: StdRwLock<Category>,
    preloading: InFlight,
    rerun: AtomicBool,
    entries_channel: Channel<Arc<Vec<RawMediaEntry>>>,
    artists_channel: Channel<ArtistView>,
    media_channel: Channel<MediaView>,
}

/// The jukebox as seen by one client.
///
/// Cheap to clone; clones share everything, including the cache, the
/// selected category and the preload guard.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}
impl Session {
    pub fn new(client: ClientId, source: EntriesHandle, resolver: Resolver, cache: Arc<CategoryCache>) -> Self {
        Self::with_options(client, source, resolver, cache, SessionOptions::default())
    }

    pub fn with_options(
        client: ClientId,
        source: EntriesHandle,
        resolver: Resolver,
        cache: Arc<CategoryCache>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                source,
                resolver,
                cache,
                options,
                entries: RwLock::new(None),
                category: StdRwLock::new(Category::default()),
                preloading: InFlight::new(),
                rerun: AtomicBool::new(false),
                entries_channel: Channel::new(options.channel_capacity),
                artists_channel: Channel::new(options.channel_capacity),
                media_channel: Channel::new(options.channel_capacity),
            }),
        }
    }

    pub fn client(&self) -> &ClientId {
        &self.inner.client
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.inner.cache
    }

    // =====================================================================
    // Raw entries
    // =====================================================================

    /// Reload the raw entries and publish them, push fresh views of the
    /// selected category, then start a background preload sweep.
    #[instrument(skip(self), fields(client = %self.inner.client))]
    pub async fn refresh_entries(&self) -> Result<PreloadHandle> {
        self.reload(false).await
    }

    /// Append an entry. The client's cached categories are dropped, and a
    /// sweep already in flight runs again once it finishes.
    pub async fn add_entry(&self, entry: RawMediaEntry) -> Result<PreloadHandle> {
        self.inner.source.add_raw_entry(&self.inner.client, entry).await?;
        self.reload(true).await
    }

    /// Remove the entry at `index`; see [`add_entry()`](Self::add_entry).
    pub async fn delete_entry(&self, index: usize) -> Result<(RawMediaEntry, PreloadHandle)> {
        let removed = self.inner.source.delete_raw_entry(&self.inner.client, index).await?;
        Ok((removed, self.reload(true).await?))
    }

    async fn reload(&self, changed: bool) -> Result<PreloadHandle> {
        let entries = self.load_entries().await?;
        tracing::debug!(count = entries.len(), changed, "Raw entries refreshed");
        // Only after the new entries are in place, so that anything resolved
        // under the new generation sees them.
        if changed {
            self.inner.cache.invalidate(&self.inner.client).await;
        }
        self.inner.entries_channel.publish(entries);
        self.publish_views().await?;

        let session = self.clone();
        Ok(tokio::spawn(async move {
            match session.run_preload(changed).await {
                Ok(report) => report,
                Err(err) => {
                    let kind: &ErrorKind = &err;
                    tracing::warn!(client = %session.inner.client, error = %kind, "Background preload failed");
                    None
                },
            }
        }))
    }

    /// The raw entries, loaded from the store on first use.
    pub async fn entries(&self) -> Result<Arc<Vec<RawMediaEntry>>> {
        if let Some(entries) = self.inner.entries.read().await.as_ref() {
            return Ok(entries.clone());
        }
        self.load_entries().await
    }

    async fn load_entries(&self) -> Result<Arc<Vec<RawMediaEntry>>> {
        let entries = self
            .inner
            .source
            .list_raw_entries(&self.inner.client)
            .await
            .or_raise(|| ErrorKind::Entries)?;
        let entries = Arc::new(entries);
        *self.inner.entries.write().await = Some(entries.clone());
        Ok(entries)
    }

    // =====================================================================
    // Resolution
    // =====================================================================

    /// Resolved items for a category: served from the cache while fresh,
    /// otherwise resolved (blocking) and stored.
    #[instrument(skip(self), fields(client = %self.inner.client))]
    pub async fn items(&self, category: Category) -> Result<Vec<ResolvedItem>> {
        let inner = &self.inner;
        if let Some(items) = inner.cache.get(&inner.client, category).await {
            return Ok(items);
        }
        let generation = inner.cache.generation(&inner.client).await;
        let entries = self.entries().await?;
        let items = inner.resolver.resolve_category(&entries, category).await;
        inner.cache.put_if_current(&inner.client, category, items.clone(), generation).await;
        Ok(items)
    }

    /// Run the warm-all sweep unless one is already running for this session.
    pub async fn preload_all(&self) -> Result<Option<PreloadReport>> {
        self.run_preload(false).await
    }

    /// With `queue_if_busy`, a sweep that is already running is asked to go
    /// again when it finishes instead of the request being dropped. The
    /// report is the one of the last pass.
    async fn run_preload(&self, queue_if_busy: bool) -> Result<Option<PreloadReport>> {
        let inner = &self.inner;
        let Some(mut guard) = inner.preloading.try_begin() else {
            if queue_if_busy {
                inner.rerun.store(true, Ordering::SeqCst);
                tracing::debug!(client = %inner.client, "Preload in flight; queued another pass");
            } else {
                tracing::debug!(client = %inner.client, "Preload already in flight; skipping");
            }
            return Ok(None);
        };
        loop {
            let report = self.sweep().await?;
            drop(guard);
            if !inner.rerun.swap(false, Ordering::SeqCst) {
                return Ok(Some(report));
            }
            match inner.preloading.try_begin() {
                Some(next) => {
                    tracing::debug!(client = %inner.client, "Entries changed during preload; sweeping again");
                    guard = next;
                },
                // Someone else started a sweep after the change; it covers it.
                None => return Ok(Some(report)),
            }
        }
    }

    async fn sweep(&self) -> Result<PreloadReport> {
        let inner = &self.inner;
        let generation = inner.cache.generation(&inner.client).await;
        let entries = self.entries().await?;
        let stagger = inner.options.preload_stagger;
        Ok(preload::preload_all(&inner.resolver, &inner.cache, &inner.client, &entries, generation, stagger).await)
    }

    // =====================================================================
    // Publication
    // =====================================================================

    pub fn category(&self) -> Category {
        *self.inner.category.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the category the next publish resolves against.
    pub fn set_category(&self, category: Category) {
        *self.inner.category.write().unwrap_or_else(PoisonError::into_inner) = category;
    }

    async fn publish_views(&self) -> Result<()> {
        let category = self.category();
        let items = self.items(category).await?;
        self.inner.artists_channel.publish(Published {
            category,
            value: group_by_artist(&items),
        });
        self.inner.media_channel.publish(Published {
            category,
            value: sort_media(items),
        });
        Ok(())
    }

    /// Resolve the current category and push the artist view to subscribers.
    pub async fn publish_artists(&self) -> Result<ArtistView> {
        let category = self.category();
        let items = self.items(category).await?;
        let view = Published {
            category,
            value: group_by_artist(&items),
        };
        self.inner.artists_channel.publish(view.clone());
        Ok(view)
    }

    /// Resolve the current category and push the sorted flat view to
    /// subscribers.
    pub async fn publish_media(&self) -> Result<MediaView> {
        let category = self.category();
        let items = self.items(category).await?;
        let view = Published {
            category,
            value: sort_media(items),
        };
        self.inner.media_channel.publish(view.clone());
        Ok(view)
    }

    pub fn subscribe_artists(&self) -> Subscription<ArtistView> {
        self.inner.artists_channel.subscribe()
    }

    pub fn subscribe_media(&self) -> Subscription<MediaView> {
        self.inner.media_channel.subscribe()
    }

    pub fn subscribe_entries(&self) -> Subscription<Arc<Vec<RawMediaEntry>>> {
        self.inner.entries_channel.subscribe()
    }
}

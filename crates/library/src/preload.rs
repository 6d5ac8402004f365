//! Warm-all-categories sweep.

use crate::resolve::Resolver;
use futures::future::join_all;
use jukebox_cache::{CategoryCache, Generation};
use jukebox_catalog::models::{Category, ClientId, RawMediaEntry};
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_STAGGER: Duration = Duration::from_secs(1);

/// What one sweep did, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    /// Resolved and stored, in category order.
    pub refreshed: Vec<Category>,
    /// Already fresh in the cache when the sweep started.
    pub fresh: Vec<Category>,
    /// Resolved, but thrown away because the client's cache was invalidated
    /// while the sweep ran.
    pub superseded: Vec<Category>,
}

/// Resolve and store every category whose cache entry is not fresh.
///
/// Stale categories are scheduled together, the `n`-th one after waiting
/// `n * stagger` (`n` being its index in [`Category::ALL`]) to spread the
/// catalog load. Freshness is checked when the sweep starts, so running it
/// again right after it finished does nothing.
///
/// `entries` must have been read after `generation` was taken from the cache;
/// results are only stored while that generation is still current.
///
/// Callers are responsible for not running two sweeps at once; see
/// [`Session::preload_all()`](crate::Session::preload_all).
#[instrument(skip(resolver, cache, entries), fields(entries = entries.len()))]
pub async fn preload_all(
    resolver: &Resolver,
    cache: &CategoryCache,
    client: &ClientId,
    entries: &[RawMediaEntry],
    generation: Generation,
    stagger: Duration,
) -> PreloadReport {
    let purged = cache.purge_expired().await;
    let mut report = PreloadReport::default();
    let mut scheduled = Vec::new();
    for (index, category) in Category::ALL.into_iter().enumerate() {
        if cache.is_valid(client, category).await {
            report.fresh.push(category);
            continue;
        }
        let delay = stagger.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
        scheduled.push(async move {
            tokio::time::sleep(delay).await;
            let items = resolver.resolve_category(entries, category).await;
            tracing::debug!(%client, %category, items = items.len(), "Preloaded category");
            let stored = cache.put_if_current(client, category, items, generation).await;
            (category, stored)
        });
    }
    tracing::info!(%client, stale = scheduled.len(), fresh = report.fresh.len(), purged, "Preload sweep started");
    for (category, stored) in join_all(scheduled).await {
        if stored {
            report.refreshed.push(category);
        } else {
            report.superseded.push(category);
        }
    }
    tracing::info!(
        %client,
        refreshed = report.refreshed.len(),
        superseded = report.superseded.len(),
        "Preload sweep finished"
    );
    report
}

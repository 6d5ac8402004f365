//! Expansion of raw entries into playable items.
//!
//! Every raw entry is resolved independently with one of four
//! [`Strategy`]s. All entries of a category are resolved concurrently and the
//! results merged; an entry whose catalog calls fail contributes nothing
//! instead of failing the category. Items without artwork get the
//! placeholder cover as a final, pure pass over the merged list.

use futures::future::join_all;
use jukebox_catalog::CatalogHandle;
use jukebox_catalog::error::{ErrorKind as CatalogErrorKind, Result as CatalogResult};
use jukebox_catalog::models::{Category, MediaSource, RawMediaEntry, ResolvedItem};
use jukebox_catalog::paging::{BULK_PAGE_SIZE, collect_pages};
use std::fmt;
use tracing::instrument;

pub const DEFAULT_PLACEHOLDER_COVER: &str = "assets/images/nocover.png";

/// How a single raw entry gets expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// Free-text search; every page is collected.
    TextSearch { query: &'a str },
    /// Everything by one artist, falling back to an `artist:<name>` text
    /// search when the enumeration comes back empty.
    ArtistEnumeration { artist_id: &'a str },
    /// A single catalog item.
    DirectLookup { id: &'a str },
    /// The entry itself is the item.
    Passthrough,
}
impl<'a> Strategy<'a> {
    /// Hints are checked in a fixed order: query, artist id, then item id
    /// (only for catalog-backed entries). Blank hints count as absent.
    pub fn classify(entry: &'a RawMediaEntry) -> Self {
        if let Some(query) = entry.query() {
            Self::TextSearch { query }
        } else if let Some(artist_id) = entry.artist_id() {
            Self::ArtistEnumeration { artist_id }
        } else if let (MediaSource::Catalog, Some(id)) = (entry.source, entry.item_id()) {
            Self::DirectLookup { id }
        } else {
            Self::Passthrough
        }
    }
}
impl fmt::Display for Strategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TextSearch { .. } => "text-search",
            Self::ArtistEnumeration { .. } => "artist-enumeration",
            Self::DirectLookup { .. } => "direct-lookup",
            Self::Passthrough => "passthrough",
        })
    }
}

/// Replace missing or blank covers with `placeholder`.
pub fn with_placeholder_covers(items: Vec<ResolvedItem>, placeholder: &str) -> Vec<ResolvedItem> {
    items
        .into_iter()
        .map(|item| if item.has_cover() { item } else { item.with_cover(placeholder.to_string()) })
        .collect()
}

fn override_artist(items: Vec<ResolvedItem>, artist: Option<&str>) -> Vec<ResolvedItem> {
    match artist {
        Some(artist) => items.into_iter().map(|item| item.with_artist(artist)).collect(),
        None => items,
    }
}

/// Resolves raw entries against one catalog.
///
/// The catalog handle should already carry the retry policy (see
/// [`RetryingCatalog`](jukebox_catalog::backend::RetryingCatalog)); the
/// resolver itself never retries.
#[derive(Clone)]
pub struct Resolver {
    catalog: CatalogHandle,
    placeholder_cover: String,
}
impl Resolver {
    pub fn new(catalog: CatalogHandle) -> Self {
        Self {
            catalog,
            placeholder_cover: DEFAULT_PLACEHOLDER_COVER.to_string(),
        }
    }

    pub fn with_placeholder_cover(mut self, cover: impl Into<String>) -> Self {
        self.placeholder_cover = cover.into();
        self
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn placeholder_cover(&self) -> &str {
        &self.placeholder_cover
    }

    /// Expand one entry, surfacing catalog failures.
    ///
    /// Overrides are applied here; placeholder covers are not.
    pub async fn resolve_entry(&self, entry: &RawMediaEntry) -> CatalogResult<Vec<ResolvedItem>> {
        let category = entry.category;
        let catalog = &self.catalog;
        match Strategy::classify(entry) {
            Strategy::TextSearch { query } => {
                let items =
                    collect_pages(BULK_PAGE_SIZE, |page| catalog.search_by_text(query, category, page)).await?;
                Ok(override_artist(items, entry.artist_override()))
            },
            Strategy::ArtistEnumeration { artist_id } => {
                let mut items =
                    collect_pages(BULK_PAGE_SIZE, |page| catalog.search_by_artist(artist_id, category, page)).await?;
                if items.is_empty()
                    && let Some(name) = entry.artist_override()
                {
                    let fallback = format!("artist:{name}");
                    tracing::debug!(artist_id, query = %fallback, "Artist enumeration empty; falling back to search");
                    items = collect_pages(BULK_PAGE_SIZE, |page| catalog.search_by_text(&fallback, category, page))
                        .await?;
                }
                Ok(override_artist(items, entry.artist_override()))
            },
            Strategy::DirectLookup { id } => {
                let mut item = catalog.lookup_by_id(id, category).await?;
                if let Some(artist) = entry.artist_override() {
                    item.artist = artist.to_string();
                }
                if let Some(title) = entry.title_override() {
                    item.title = title.to_string();
                }
                Ok(vec![item])
            },
            Strategy::Passthrough => Ok(vec![ResolvedItem::from(entry)]),
        }
    }

    /// Expand one entry, degrading any failure to an empty contribution.
    async fn resolve_entry_or_empty(&self, index: usize, entry: &RawMediaEntry) -> Vec<ResolvedItem> {
        let strategy = Strategy::classify(entry);
        tracing::debug!(index, %strategy, "Resolving raw entry");
        match self.resolve_entry(entry).await {
            Ok(items) => items,
            Err(err) => {
                let kind: &CatalogErrorKind = &err;
                if let CatalogErrorKind::NotFound(_) = kind {
                    tracing::debug!(index, %strategy, error = %kind, "Raw entry not found in catalog");
                } else {
                    tracing::warn!(index, %strategy, error = %kind, "Raw entry could not be resolved; skipping");
                }
                Vec::new()
            },
        }
    }

    /// Resolve every entry of `category` and merge the results.
    ///
    /// Entries of other categories are ignored. Never fails: the result is
    /// whatever could be assembled, possibly empty. Every returned item has
    /// a cover.
    #[instrument(skip(self, entries), fields(catalog = self.catalog.name(), entries = entries.len()))]
    pub async fn resolve_category(&self, entries: &[RawMediaEntry], category: Category) -> Vec<ResolvedItem> {
        let pending = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.category == category)
            .map(|(index, entry)| self.resolve_entry_or_empty(index, entry));
        let merged: Vec<ResolvedItem> = join_all(pending).await.into_iter().flatten().collect();
        tracing::debug!(items = merged.len(), "Category resolved");
        with_placeholder_covers(merged, &self.placeholder_cover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_catalog::backend::{MockCall, MockCatalog, RetryingCatalog};
    use jukebox_catalog::models::ContentType;
    use jukebox_catalog::retry::RetryPolicy;
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Duration;

    fn album(id: &str, artist: &str, cover: Option<&str>) -> ResolvedItem {
        ResolvedItem::catalog(id, format!("Album {id}"), Category::Music)
            .with_artist(artist)
            .with_cover(cover.map(str::to_string))
    }

    fn entry(category: Category) -> RawMediaEntry {
        RawMediaEntry {
            source: MediaSource::Catalog,
            category,
            ..RawMediaEntry::default()
        }
    }

    fn resolver(mock: MockCatalog) -> (Arc<MockCatalog>, Resolver) {
        let mock = Arc::new(mock);
        (mock.clone(), Resolver::new(mock))
    }

    #[rstest]
    #[case::query(Some("foo"), Some("A1"), Some("X"), MediaSource::Catalog, Strategy::TextSearch { query: "foo" })]
    #[case::blank_query(Some("  "), Some("A1"), None, MediaSource::Catalog, Strategy::ArtistEnumeration { artist_id: "A1" })]
    #[case::item(None, None, Some("X"), MediaSource::Catalog, Strategy::DirectLookup { id: "X" })]
    #[case::library_item(None, None, Some("X"), MediaSource::Library, Strategy::Passthrough)]
    #[case::nothing(None, None, None, MediaSource::Catalog, Strategy::Passthrough)]
    fn test_classify(
        #[case] query: Option<&str>,
        #[case] artist_id: Option<&str>,
        #[case] id: Option<&str>,
        #[case] source: MediaSource,
        #[case] expected: Strategy<'static>,
    ) {
        let entry = RawMediaEntry {
            source,
            query: query.map(str::to_string),
            artist_id: artist_id.map(str::to_string),
            id: id.map(str::to_string),
            ..RawMediaEntry::default()
        };
        assert_eq!(Strategy::classify(&entry), expected);
    }

    #[test]
    fn test_placeholder_covers() {
        let items = vec![album("1", "A", Some("x.jpg")), album("2", "A", None), album("3", "A", Some(" "))];
        let covered = with_placeholder_covers(items, "none.png");
        let covers: Vec<_> = covered.iter().map(|item| item.cover.as_deref()).collect();
        assert_eq!(covers, vec![Some("x.jpg"), Some("none.png"), Some("none.png")]);
    }

    #[tokio::test]
    async fn test_artist_fallback_search() {
        let (mock, resolver) = resolver(
            MockCatalog::default().with_artist(Category::Music, "A1", []).with_search(
                Category::Music,
                "artist:Band X",
                [album("1", "Someone", None), album("2", "Someone", None), album("3", "Else", None)],
            ),
        );
        let raw = RawMediaEntry {
            artist_id: Some("A1".to_string()),
            artist: Some("Band X".to_string()),
            ..entry(Category::Music)
        };
        let items = resolver.resolve_category(&[raw], Category::Music).await;
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.artist == "Band X"));
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::Artist { artist_id: "A1".to_string(), category: Category::Music, page: 0 },
                MockCall::Text { query: "artist:Band X".to_string(), category: Category::Music, page: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_artist_without_name_has_no_fallback() {
        let (mock, resolver) = resolver(MockCatalog::default());
        let raw = RawMediaEntry {
            artist_id: Some("A1".to_string()),
            ..entry(Category::Music)
        };
        assert!(resolver.resolve_category(&[raw], Category::Music).await.is_empty());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_text_search_collects_all_pages() {
        let results: Vec<_> = (0..120).map(|n| album(&n.to_string(), "Reader", Some("c.jpg"))).collect();
        let (mock, resolver) =
            resolver(MockCatalog::default().with_search(Category::Audiobook, "Benjamin", results.clone()));
        let raw = RawMediaEntry {
            query: Some("Benjamin".to_string()),
            ..entry(Category::Audiobook)
        };
        let items = resolver.resolve_category(&[raw], Category::Audiobook).await;
        assert_eq!(items.len(), 120);
        assert!(items.iter().all(|item| item.category == Category::Audiobook));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_direct_lookup_overrides() {
        let (_, resolver) = resolver(
            MockCatalog::default()
                .with_item(album("xyz", "Original", Some("c.jpg")).with_content_type(ContentType::Single)),
        );
        let raw = RawMediaEntry {
            id: Some("xyz".to_string()),
            artist: Some("Kid's Choice".to_string()),
            title: Some("Favourite Song".to_string()),
            ..entry(Category::Music)
        };
        let items = resolver.resolve_category(&[raw], Category::Music).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].artist, "Kid's Choice");
        assert_eq!(items[0].title, "Favourite Song");
        assert_eq!(items[0].content_type, Some(ContentType::Single));
    }

    #[tokio::test]
    async fn test_passthrough_gets_placeholder() {
        let (mock, resolver) = resolver(MockCatalog::default());
        let raw = RawMediaEntry {
            source: MediaSource::Library,
            category: Category::Radio,
            artist: Some("Radio Teddy".to_string()),
            title: Some("Live".to_string()),
            id: Some("https://stream.example/teddy.mp3".to_string()),
            ..RawMediaEntry::default()
        };
        let items = resolver.resolve_category(&[raw], Category::Radio).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, MediaSource::Library);
        assert_eq!(items[0].cover.as_deref(), Some(DEFAULT_PLACEHOLDER_COVER));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_filters_by_category() {
        let (mock, resolver) = resolver(
            MockCatalog::default()
                .with_search(Category::Music, "songs", [album("1", "A", None)])
                .with_search(Category::Audiobook, "stories", [album("2", "B", None)]),
        );
        let entries = [
            RawMediaEntry {
                query: Some("songs".to_string()),
                ..entry(Category::Music)
            },
            RawMediaEntry {
                query: Some("stories".to_string()),
                ..entry(Category::Audiobook)
            },
        ];
        let items = resolver.resolve_category(&entries, Category::Audiobook).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("2"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_entry_does_not_abort_category() {
        let mock = Arc::new(
            MockCatalog::default()
                .with_search(Category::Audiobook, "foo", [album("1", "A", None), album("2", "A", None)])
                .failing("broken", CatalogErrorKind::Network("connection reset".to_string())),
        );
        let retrying = RetryingCatalog::new(mock.clone(), RetryPolicy::default());
        let resolver = Resolver::new(Arc::new(retrying));
        let entries = [
            RawMediaEntry {
                query: Some("foo".to_string()),
                ..entry(Category::Audiobook)
            },
            RawMediaEntry {
                query: Some("broken".to_string()),
                ..entry(Category::Audiobook)
            },
        ];
        let items = resolver.resolve_category(&entries, Category::Audiobook).await;
        let mut ids: Vec<_> = items.iter().filter_map(|item| item.id.as_deref()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_entry_gives_up_after_budget() {
        let mock = Arc::new(
            MockCatalog::default()
                .with_search(Category::Music, "ok", [album("1", "A", None)])
                .failing("busy", CatalogErrorKind::RateLimited),
        );
        let resolver = Resolver::new(Arc::new(RetryingCatalog::new(mock.clone(), RetryPolicy::default())));
        let entries = [
            RawMediaEntry {
                query: Some("ok".to_string()),
                ..entry(Category::Music)
            },
            RawMediaEntry {
                query: Some("busy".to_string()),
                ..entry(Category::Music)
            },
        ];
        let start = tokio::time::Instant::now();
        let items = resolver.resolve_category(&entries, Category::Music).await;
        assert_eq!(items.len(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(60 + 120 + 240 + 480));
        let busy_calls =
            mock.calls().into_iter().filter(|call| matches!(call, MockCall::Text { query, .. } if query == "busy")).count();
        assert_eq!(busy_calls, 5);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let (_, resolver) = resolver(
            MockCatalog::default().with_search(Category::Music, "foo", [album("1", "A", None), album("2", "B", None)]),
        );
        let raw = [RawMediaEntry {
            query: Some("foo".to_string()),
            ..entry(Category::Music)
        }];
        let first = resolver.resolve_category(&raw, Category::Music).await;
        let second = resolver.resolve_category(&raw, Category::Music).await;
        assert_eq!(first, second);
        assert!(first.iter().all(ResolvedItem::has_cover));
    }
}

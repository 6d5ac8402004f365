//! Catalog trait and implementations.
//!
//! This module defines the [`Catalog`] trait: the three lookups the resolution
//! engine needs from an external music catalog, normalised into
//! [`ResolvedItem`]s. The engine only ever talks to a [`CatalogHandle`], so a
//! concrete provider, an in-memory mock, or a [`RetryingCatalog`] decorator
//! wrapping either of them are interchangeable.

#[cfg(any(test, feature = "mock"))]
mod mock;
mod retrying;
mod spotify;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockCall, MockCatalog};
pub use self::retrying::RetryingCatalog;
pub use self::spotify::{DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL, SpotifyCatalog, SpotifyCredentials};
use crate::CatalogHandle;
use crate::error::Result;
use crate::models::{Category, Page, PageRequest, ResolvedItem};
use async_trait::async_trait;

/// Unified interface for music catalogs.
///
/// All calls are asynchronous and fail with a tagged
/// [`ErrorKind`](crate::error::ErrorKind) so callers can tell rate limiting
/// and expired credentials apart from everything else. Results are already
/// normalised: `category` is set to the requested category and `source` to
/// [`MediaSource::Catalog`](crate::models::MediaSource::Catalog).
///
/// Listing calls are paginated; the first page's [`Page::total`] tells the
/// caller how many more pages exist. See
/// [`collect_pages()`](crate::paging::collect_pages) for the fan-out.
///
/// # Examples
///
/// ```
/// use jukebox_catalog::{Catalog, error::Result};
/// use jukebox_catalog::models::{Category, PageRequest};
///
/// async fn count_matches(catalog: &dyn Catalog, query: &str) -> Result<usize> {
///     let first = catalog.search_by_text(query, Category::Audiobook, PageRequest::new(0, 20)).await?;
///     Ok(first.total)
/// }
/// ```
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the catalog, used for logging only.
    fn name(&self) -> &str;

    /// Free-text search.
    async fn search_by_text(&self, query: &str, category: Category, page: PageRequest) -> Result<Page>;

    /// Enumerate everything published by one artist.
    async fn search_by_artist(&self, artist_id: &str, category: Category, page: PageRequest) -> Result<Page>;

    /// Fetch a single item by its catalog id.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the id does
    /// not exist.
    async fn lookup_by_id(&self, id: &str, category: Category) -> Result<ResolvedItem>;
}

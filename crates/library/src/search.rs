//! Interactive catalog search, one page at a time.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use jukebox_catalog::Catalog;
use jukebox_catalog::models::{Category, PageRequest, ResolvedItem};
use jukebox_catalog::paging::{INTERACTIVE_PAGE_SIZE, MAX_COLLECTED_ITEMS, page_count};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<ResolvedItem>,
    /// Zero-based.
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Fetch one page of search results for someone browsing the catalog.
///
/// Unlike resolution, failures are returned: the person searching should see
/// that something went wrong rather than an empty result. A blank query
/// returns an empty page without asking the catalog.
pub async fn search_catalog(catalog: &dyn Catalog, query: &str, category: Category, page: usize) -> Result<SearchPage> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchPage {
            items: Vec::new(),
            page,
            total: 0,
            total_pages: 0,
        });
    }
    let request = PageRequest::new(page, INTERACTIVE_PAGE_SIZE);
    let result = catalog.search_by_text(query, category, request).await.or_raise(|| ErrorKind::Catalog)?;
    let reachable = result.total.min(MAX_COLLECTED_ITEMS);
    Ok(SearchPage {
        items: result.items,
        page,
        total: result.total,
        total_pages: page_count(reachable, INTERACTIVE_PAGE_SIZE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_catalog::backend::{MockCall, MockCatalog};
    use jukebox_catalog::error::ErrorKind as CatalogErrorKind;

    fn catalog(count: usize) -> MockCatalog {
        let results = (0..count).map(|n| ResolvedItem::catalog(n.to_string(), format!("Result {n}"), Category::Music));
        MockCatalog::default().with_search(Category::Music, "lullaby", results)
    }

    #[tokio::test]
    async fn test_page_and_total_pages() {
        let catalog = catalog(45);
        let page = search_catalog(&catalog, "lullaby", Category::Music, 2).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].title, "Result 40");
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert_eq!(
            catalog.calls(),
            vec![MockCall::Text { query: "lullaby".to_string(), category: Category::Music, page: 2 }]
        );
    }

    #[tokio::test]
    async fn test_total_pages_capped() {
        let catalog = catalog(5000);
        let page = search_catalog(&catalog, "lullaby", Category::Music, 0).await.unwrap();
        assert_eq!(page.total, 5000);
        assert_eq!(page.total_pages, 50);
    }

    #[tokio::test]
    async fn test_blank_query_skips_catalog() {
        let catalog = catalog(3);
        let page = search_catalog(&catalog, "   ", Category::Music, 0).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(catalog.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_surface() {
        let catalog = catalog(3).failing("lullaby", CatalogErrorKind::Unauthorized);
        let err = search_catalog(&catalog, "lullaby", Category::Music, 0).await.unwrap_err();
        assert_eq!(&*err, &ErrorKind::Catalog);
    }
}

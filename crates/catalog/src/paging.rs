//! Page fan-out for paginated catalog listings.

use crate::error::Result;
use crate::models::{Page, PageRequest, ResolvedItem};
use futures::future::try_join_all;
use std::future::Future;

/// Page size for bulk expansion (text search and artist enumeration).
pub const BULK_PAGE_SIZE: usize = 50;
/// Page size for interactive search where a person is scrolling results.
pub const INTERACTIVE_PAGE_SIZE: usize = 20;
/// Catalogs refuse offsets past this point, so don't bother asking.
pub const MAX_COLLECTED_ITEMS: usize = 1000;

/// Number of pages needed to cover `total` items.
pub fn page_count(total: usize, size: usize) -> usize {
    total.div_ceil(size.max(1))
}

/// Fetch every page of a listing.
///
/// The first page is fetched on its own to learn the reported total; all
/// remaining pages are then requested concurrently and joined. Pages are
/// concatenated in page order, although callers should not rely on the
/// order meaning anything. If any page fails the whole listing fails.
pub async fn collect_pages<F, Fut>(size: usize, fetch: F) -> Result<Vec<ResolvedItem>>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let first = fetch(PageRequest::new(0, size)).await?;
    let pages = page_count(first.total.min(MAX_COLLECTED_ITEMS), size);
    let rest = try_join_all((1..pages).map(|index| fetch(PageRequest::new(index, size)))).await?;
    let mut items = first.items;
    for page in rest {
        items.extend(page.items);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Category;
    use rstest::rstest;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn page_of(request: PageRequest, total: usize) -> Page {
        let items = (request.offset()..(request.offset() + request.size).min(total))
            .map(|n| ResolvedItem::catalog(n.to_string(), format!("Item {n}"), Category::Music))
            .collect();
        Page { items, total }
    }

    #[rstest]
    #[case(0, 50, 0)]
    #[case(1, 50, 1)]
    #[case(50, 50, 1)]
    #[case(51, 50, 2)]
    #[case(120, 50, 3)]
    fn test_page_count(#[case] total: usize, #[case] size: usize, #[case] expected: usize) {
        assert_eq!(page_count(total, size), expected);
    }

    #[tokio::test]
    async fn test_collects_every_page() {
        let requested = Mutex::new(Vec::new());
        let items = collect_pages(BULK_PAGE_SIZE, |request| {
            requested.lock().unwrap().push(request.index);
            async move { Ok(page_of(request, 120)) }
        })
        .await
        .unwrap();
        assert_eq!(items.len(), 120);
        assert_eq!(*requested.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(items[119].id.as_deref(), Some("119"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_pages_are_fetched_concurrently() {
        let started = Instant::now();
        let items = collect_pages(BULK_PAGE_SIZE, |request| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(page_of(request, 200))
        })
        .await
        .unwrap();
        assert_eq!(items.len(), 200);
        // One round-trip for the first page, one for the other three together.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_total_is_capped() {
        let requested = Mutex::new(0usize);
        collect_pages(BULK_PAGE_SIZE, |request| {
            *requested.lock().unwrap() += 1;
            async move { Ok(page_of(request, 1_000_000)) }
        })
        .await
        .unwrap();
        assert_eq!(*requested.lock().unwrap(), MAX_COLLECTED_ITEMS / BULK_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_failed_page_fails_listing() {
        let result = collect_pages(BULK_PAGE_SIZE, |request| async move {
            if request.index == 1 {
                Err(exn::Exn::from(ErrorKind::Network("reset".to_string())))
            } else {
                Ok(page_of(request, 100))
            }
        })
        .await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Network(_)));
    }
}

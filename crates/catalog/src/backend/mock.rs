//! In-memory catalog for testing.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{Category, MediaSource, Page, PageRequest, ResolvedItem};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A call the mock has received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Text { query: String, category: Category, page: usize },
    Artist { artist_id: String, category: Category, page: usize },
    Lookup { id: String, category: Category },
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    kind: ErrorKind,
    /// `None` fails forever.
    remaining: Option<usize>,
}

/// In-memory catalog for testing.
///
/// Results are registered up-front with the `with_*` builders and served with
/// real pagination (honouring [`PageRequest`] and reporting the full total).
/// Failures can be scripted per *target* (a query string, artist id, or item
/// id) either permanently or for the first `n` calls, which makes retry and
/// partial-failure behaviour easy to exercise. Unknown queries and artists
/// return an empty listing; unknown ids return
/// [`NotFound`](ErrorKind::NotFound).
///
/// # Examples
///
/// ```
/// use jukebox_catalog::backend::MockCatalog;
/// use jukebox_catalog::error::ErrorKind;
/// use jukebox_catalog::models::{Category, ResolvedItem};
///
/// let catalog = MockCatalog::default()
///     .with_search(Category::Music, "lullabies", [ResolvedItem::catalog("1", "Sleepy", Category::Music)])
///     .failing_times("lullabies", ErrorKind::RateLimited, 2);
/// ```
pub struct MockCatalog {
    name: String,
    text: HashMap<(Category, String), Vec<ResolvedItem>>,
    artists: HashMap<(Category, String), Vec<ResolvedItem>>,
    items: HashMap<String, ResolvedItem>,
    failures: Mutex<HashMap<String, ScriptedFailure>>,
    calls: Mutex<Vec<MockCall>>,
}
impl Default for MockCatalog {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            text: HashMap::new(),
            artists: HashMap::new(),
            items: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}
impl MockCatalog {
    /// Change the name of the mock catalog.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register the results of a free-text search.
    pub fn with_search(
        mut self,
        category: Category,
        query: impl Into<String>,
        items: impl IntoIterator<Item = ResolvedItem>,
    ) -> Self {
        self.text.insert((category, query.into()), items.into_iter().collect());
        self
    }

    /// Register everything published by one artist.
    pub fn with_artist(
        mut self,
        category: Category,
        artist_id: impl Into<String>,
        items: impl IntoIterator<Item = ResolvedItem>,
    ) -> Self {
        self.artists.insert((category, artist_id.into()), items.into_iter().collect());
        self
    }

    /// Register an item for direct lookup, keyed by its id.
    ///
    /// Panics if the item has no id. If test setup is wrong, then test should
    /// not pass.
    pub fn with_item(mut self, item: ResolvedItem) -> Self {
        let Some(id) = item.id.clone() else {
            panic!("MockCatalog::with_item: item {:?} has no id", item.title);
        };
        self.items.insert(id, item);
        self
    }

    /// Make every call for `target` fail with `kind`.
    pub fn failing(self, target: impl Into<String>, kind: ErrorKind) -> Self {
        self.script_failure(target.into(), kind, None)
    }

    /// Make the next `times` calls for `target` fail with `kind`, then behave
    /// normally.
    pub fn failing_times(self, target: impl Into<String>, kind: ErrorKind, times: usize) -> Self {
        self.script_failure(target.into(), kind, Some(times))
    }

    fn script_failure(self, target: String, kind: ErrorKind, remaining: Option<usize>) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, ScriptedFailure { kind, remaining });
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn check_failure(&self, target: &str) -> Result<()> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(failure) = failures.get_mut(target) else {
            return Ok(());
        };
        match failure.remaining {
            Some(0) => {
                failures.remove(target);
                Ok(())
            },
            Some(n) => {
                failure.remaining = Some(n - 1);
                Err(exn::Exn::from(failure.kind.clone()))
            },
            None => Err(exn::Exn::from(failure.kind.clone())),
        }
    }

    fn normalise(item: &ResolvedItem, category: Category) -> ResolvedItem {
        ResolvedItem {
            category,
            source: MediaSource::Catalog,
            ..item.clone()
        }
    }

    fn page(items: Option<&Vec<ResolvedItem>>, category: Category, request: PageRequest) -> Page {
        let Some(items) = items else {
            return Page::default();
        };
        let items_on_page = items
            .iter()
            .skip(request.offset())
            .take(request.size)
            .map(|item| Self::normalise(item, category))
            .collect();
        Page { items: items_on_page, total: items.len() }
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_by_text(&self, query: &str, category: Category, page: PageRequest) -> Result<Page> {
        self.record(MockCall::Text { query: query.to_string(), category, page: page.index });
        self.check_failure(query)?;
        Ok(Self::page(self.text.get(&(category, query.to_string())), category, page))
    }

    async fn search_by_artist(&self, artist_id: &str, category: Category, page: PageRequest) -> Result<Page> {
        self.record(MockCall::Artist { artist_id: artist_id.to_string(), category, page: page.index });
        self.check_failure(artist_id)?;
        Ok(Self::page(self.artists.get(&(category, artist_id.to_string())), category, page))
    }

    async fn lookup_by_id(&self, id: &str, category: Category) -> Result<ResolvedItem> {
        self.record(MockCall::Lookup { id: id.to_string(), category });
        self.check_failure(id)?;
        self.items
            .get(id)
            .map(|item| Self::normalise(item, category))
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(id.to_string())))
    }
}

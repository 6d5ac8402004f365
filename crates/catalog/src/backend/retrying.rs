//! Catalog decorator applying the retry policy to every call.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{Category, Page, PageRequest, ResolvedItem};
use crate::retry::RetryPolicy;
use crate::token::TokenSource;
use crate::CatalogHandle;
use async_trait::async_trait;
use std::sync::Arc;

/// Retrying catalog.
///
/// Wraps another catalog and routes every call through one [`RetryPolicy`],
/// so rate limiting and credential expiry are handled identically no matter
/// which lookup hit them. `Unauthorized` responses refresh credentials via the
/// attached [`TokenSource`]; without one they fail with
/// [`Credentials`](ErrorKind::Credentials) instead.
#[derive(Clone)]
pub struct RetryingCatalog {
    inner: CatalogHandle,
    policy: RetryPolicy,
    tokens: Option<Arc<TokenSource>>,
}
impl RetryingCatalog {
    pub fn new(inner: CatalogHandle, policy: RetryPolicy) -> Self {
        Self { inner, policy, tokens: None }
    }

    pub fn with_tokens(mut self, tokens: Arc<TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    async fn refresh(&self) -> Result<()> {
        match &self.tokens {
            Some(tokens) => tokens.refresh().await.map(|_| ()),
            None => exn::bail!(ErrorKind::Credentials(format!("catalog {} has no token source", self.inner.name()))),
        }
    }
}

#[async_trait]
impl Catalog for RetryingCatalog {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search_by_text(&self, query: &str, category: Category, page: PageRequest) -> Result<Page> {
        self.policy
            .run("search_by_text", || self.inner.search_by_text(query, category, page), || self.refresh())
            .await
    }

    async fn search_by_artist(&self, artist_id: &str, category: Category, page: PageRequest) -> Result<Page> {
        self.policy
            .run("search_by_artist", || self.inner.search_by_artist(artist_id, category, page), || self.refresh())
            .await
    }

    async fn lookup_by_id(&self, id: &str, category: Category) -> Result<ResolvedItem> {
        self.policy.run("lookup_by_id", || self.inner.lookup_by_id(id, category), || self.refresh()).await
    }
}

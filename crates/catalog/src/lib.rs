//! Music catalog access for the jukebox.
//!
//! The [`Catalog`] trait is the seam between media resolution and an external
//! catalog. [`SpotifyCatalog`](backend::SpotifyCatalog) talks to the Spotify
//! Web API; [`RetryingCatalog`](backend::RetryingCatalog) wraps any catalog
//! with rate-limit backoff and credential refresh, and
//! [`collect_pages()`](paging::collect_pages) turns a paginated listing into
//! one list by fetching the remaining pages concurrently.

pub mod backend;
pub mod error;
pub mod models;
pub mod paging;
pub mod retry;
pub mod token;

pub use crate::backend::Catalog;
use std::sync::Arc;

pub type CatalogHandle = Arc<dyn Catalog + Send + Sync>;

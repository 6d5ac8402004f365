//! Media resolution pipeline.
//!
//! Raw entries authored for a client are expanded against the catalog by the
//! [`Resolver`], cached per category, grouped into the artist view and pushed
//! to subscribers. [`Session`] ties those pieces together for one client.
//!
//! ```text
//! EntrySource ──▶ Resolver ──▶ CategoryCache ──▶ group/sort ──▶ Channel
//!                    │
//!                    └──▶ Catalog (RetryingCatalog ▶ SpotifyCatalog)
//! ```

pub mod entries;
pub mod error;
pub mod group;
pub mod preload;
pub mod publish;
mod resolve;
mod search;
mod session;

pub use crate::resolve::{DEFAULT_PLACEHOLDER_COVER, Resolver, Strategy, with_placeholder_covers};
pub use crate::search::{SearchPage, search_catalog};
pub use crate::session::{ArtistView, MediaView, PreloadHandle, Session, SessionOptions};

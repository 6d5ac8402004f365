//! In-memory cache of resolved media.
//!
//! The cache is purely an optimisation: resolved items are always derivable
//! from the raw entries and the catalog, so nothing here is persisted. Each
//! `(client, category)` pair holds the list most recently stored for it until
//! the entry's TTL runs out; after that the entry is treated as absent and the
//! caller has to resolve again.

mod store;

pub use crate::store::{CacheKey, CategoryCache, DEFAULT_TTL, Generation, MAX_TTL};

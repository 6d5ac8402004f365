//! Raw-entry persistence.
//!
//! The jukebox only ever reads the raw entry list for a client, appends to it
//! or deletes from it by index. [`EntrySource`] is that contract;
//! [`MemoryEntries`] keeps lists in memory and [`JsonFileEntries`] stores one
//! JSON array per client on disk.

mod json;
mod memory;

pub use self::json::JsonFileEntries;
pub use self::memory::MemoryEntries;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use jukebox_catalog::models::{ClientId, RawMediaEntry};
use std::sync::Arc;

pub type EntriesHandle = Arc<dyn EntrySource + Send + Sync>;

#[async_trait]
pub trait EntrySource: Send + Sync {
    /// All raw entries for a client, in authoring order. A client nobody has
    /// written to yet has an empty list.
    async fn list_raw_entries(&self, client: &ClientId) -> Result<Vec<RawMediaEntry>>;

    /// Append an entry to the client's list.
    async fn add_raw_entry(&self, client: &ClientId, entry: RawMediaEntry) -> Result<()>;

    /// Remove the entry at `index`, returning it.
    ///
    /// Fails with [`EntryNotFound`](ErrorKind::EntryNotFound) when the index
    /// is out of range.
    async fn delete_raw_entry(&self, client: &ClientId, index: usize) -> Result<RawMediaEntry>;
}

/// Reject client ids that could not safely be used as a file name.
pub(crate) fn validate_client(client: &ClientId) -> Result<()> {
    let id = client.as_str();
    let safe = !id.is_empty()
        && !id.starts_with('.')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !safe {
        exn::bail!(ErrorKind::InvalidClient(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kitchen", true)]
    #[case("living-room_2", true)]
    #[case("aa:bb:cc", false)]
    #[case("", false)]
    #[case("../etc", false)]
    #[case(".hidden", false)]
    #[case("a/b", false)]
    fn test_validate_client(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(validate_client(&ClientId::from(id)).is_ok(), valid);
    }
}

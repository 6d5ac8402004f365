use super::EntrySource;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use jukebox_catalog::models::{ClientId, RawMediaEntry};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory raw entries.
///
/// # Examples
///
/// ```
/// use jukebox_catalog::models::{ClientId, RawMediaEntry};
/// use jukebox_library::entries::{EntrySource, MemoryEntries};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClientId::from("kitchen");
/// let entries = MemoryEntries::default().with_entries(client.clone(), [RawMediaEntry::default()]);
/// assert_eq!(entries.list_raw_entries(&client).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryEntries {
    clients: RwLock<HashMap<ClientId, Vec<RawMediaEntry>>>,
}
impl MemoryEntries {
    /// Pre-populate one client's list.
    pub fn with_entries(self, client: ClientId, entries: impl IntoIterator<Item = RawMediaEntry>) -> Self {
        let mut clients = self.clients.into_inner();
        clients.entry(client).or_default().extend(entries);
        Self {
            clients: RwLock::new(clients),
        }
    }
}

#[async_trait]
impl EntrySource for MemoryEntries {
    async fn list_raw_entries(&self, client: &ClientId) -> Result<Vec<RawMediaEntry>> {
        Ok(self.clients.read().await.get(client).cloned().unwrap_or_default())
    }

    async fn add_raw_entry(&self, client: &ClientId, entry: RawMediaEntry) -> Result<()> {
        self.clients.write().await.entry(client.clone()).or_default().push(entry);
        Ok(())
    }

    async fn delete_raw_entry(&self, client: &ClientId, index: usize) -> Result<RawMediaEntry> {
        let mut clients = self.clients.write().await;
        match clients.get_mut(client) {
            Some(entries) if index < entries.len() => Ok(entries.remove(index)),
            _ => exn::bail!(ErrorKind::EntryNotFound(index)),
        }
    }
}

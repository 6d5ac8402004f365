use super::{EntrySource, validate_client};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use jukebox_catalog::models::{ClientId, RawMediaEntry};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Raw entries stored as one JSON array per client (`<dir>/<client>.json`).
///
/// A missing file is an empty list. Writes go through a temporary file and a
/// rename, and are serialised within the process so concurrent edits cannot
/// lose each other's changes.
#[derive(Debug)]
pub struct JsonFileEntries {
    dir: PathBuf,
    writes: Mutex<()>,
}
impl JsonFileEntries {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, client: &ClientId) -> Result<PathBuf> {
        validate_client(client)?;
        Ok(self.dir.join(format!("{client}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Vec<RawMediaEntry>> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Entries),
        };
        serde_json::from_slice(&data).or_raise(|| ErrorKind::InvalidEntries)
    }

    async fn write(&self, path: &Path, entries: &[RawMediaEntry]) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries).or_raise(|| ErrorKind::InvalidEntries)?;
        fs::create_dir_all(&self.dir).await.or_raise(|| ErrorKind::Entries)?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, data).await.or_raise(|| ErrorKind::Entries)?;
        fs::rename(&temp, path).await.or_raise(|| ErrorKind::Entries)?;
        Ok(())
    }
}

#[async_trait]
impl EntrySource for JsonFileEntries {
    async fn list_raw_entries(&self, client: &ClientId) -> Result<Vec<RawMediaEntry>> {
        let path = self.path(client)?;
        self.read(&path).await
    }

    async fn add_raw_entry(&self, client: &ClientId, entry: RawMediaEntry) -> Result<()> {
        let path = self.path(client)?;
        let _guard = self.writes.lock().await;
        let mut entries = self.read(&path).await?;
        entries.push(entry);
        self.write(&path, &entries).await?;
        tracing::debug!(%client, count = entries.len(), "Raw entry added");
        Ok(())
    }

    async fn delete_raw_entry(&self, client: &ClientId, index: usize) -> Result<RawMediaEntry> {
        let path = self.path(client)?;
        let _guard = self.writes.lock().await;
        let mut entries = self.read(&path).await?;
        if index >= entries.len() {
            exn::bail!(ErrorKind::EntryNotFound(index));
        }
        let removed = entries.remove(index);
        self.write(&path, &entries).await?;
        tracing::debug!(%client, index, "Raw entry deleted");
        Ok(removed)
    }
}

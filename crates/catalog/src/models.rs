//! Media models shared by every jukebox crate.
//!
//! [`RawMediaEntry`] is what a parent authors (and what the persistence layer
//! stores); [`ResolvedItem`] is what the catalog expands it into. Both
//! serialize to the camelCase JSON shape the front-end already speaks.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of content kinds that partition both raw entries and cache
/// entries.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    #[display("audiobook")]
    Audiobook,
    #[display("music")]
    Music,
    #[display("playlist")]
    Playlist,
    #[display("radio")]
    Radio,
}
impl Category {
    /// Every category, in display (and preload) order.
    pub const ALL: [Category; 4] = [Self::Audiobook, Self::Music, Self::Playlist, Self::Radio];
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown category: {_0}")]
pub struct UnknownCategory(#[error(not(source))] pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audiobook" | "audiobooks" => Ok(Self::Audiobook),
            "music" => Ok(Self::Music),
            "playlist" | "playlists" => Ok(Self::Playlist),
            "radio" => Ok(Self::Radio),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Where a piece of media comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSource {
    /// Backed by the external music catalog; needs resolving.
    #[serde(rename = "spotify", alias = "catalog")]
    Catalog,
    /// Entered by hand (local library, stream URL, …); used as-is.
    #[default]
    #[serde(rename = "library", alias = "manual")]
    Library,
}

/// Distinguishes what kind of playable unit a resolved item is.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[display("album")]
    Album,
    #[display("single")]
    Single,
    #[display("compilation")]
    Compilation,
    #[display("track")]
    Track,
    #[display("playlist")]
    Playlist,
}

/// Opaque identity of a jukebox device/browser.
///
/// Always passed explicitly; nothing in the jukebox crates reads ambient
/// session state to figure out who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);
impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user-authored reference to content that has not been resolved yet.
///
/// Exactly one resolution hint is expected to be set (`query`, `artist_id`,
/// `id`, or the manual `artist`/`title`/`cover` triple), but the persisted
/// shape is loose so the accessors below treat blank strings as absent.
/// `artist` and `title` double as overrides applied to resolved results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMediaEntry {
    #[serde(rename = "type", default)]
    pub source: MediaSource,
    /// Missing categories are treated as [`Category::Audiobook`].
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, alias = "artistid", skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}
impl RawMediaEntry {
    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn query(&self) -> Option<&str> {
        Self::non_blank(&self.query)
    }

    pub fn artist_id(&self) -> Option<&str> {
        Self::non_blank(&self.artist_id)
    }

    pub fn item_id(&self) -> Option<&str> {
        Self::non_blank(&self.id)
    }

    pub fn artist_override(&self) -> Option<&str> {
        Self::non_blank(&self.artist)
    }

    pub fn title_override(&self) -> Option<&str> {
        Self::non_blank(&self.title)
    }
}

/// A playable unit, either expanded from the catalog or passed through from a
/// manual entry.
///
/// `cover` is optional here; resolution replaces missing covers with a
/// placeholder before anything is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    /// Catalog id, or `None` for manual items.
    pub id: Option<String>,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    pub cover: Option<String>,
    #[serde(rename = "type")]
    pub source: MediaSource,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}
impl ResolvedItem {
    /// A catalog-backed item with no artist or cover yet.
    pub fn catalog(id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self {
            id: Some(id.into()),
            artist: String::new(),
            title: title.into(),
            cover: None,
            source: MediaSource::Catalog,
            category,
            content_type: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_cover(mut self, cover: impl Into<Option<String>>) -> Self {
        self.cover = cover.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<Option<ContentType>>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// `true` when the item has a usable (non-blank) cover reference.
    pub fn has_cover(&self) -> bool {
        self.cover.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}
impl From<&RawMediaEntry> for ResolvedItem {
    /// Passthrough: the entry itself becomes the one resolved item.
    fn from(entry: &RawMediaEntry) -> Self {
        Self {
            id: entry.id.clone(),
            artist: entry.artist.clone().unwrap_or_default(),
            title: entry.title.clone().unwrap_or_default(),
            cover: entry.cover.clone(),
            source: entry.source,
            category: entry.category,
            content_type: entry.content_type,
        }
    }
}

/// Which slice of a paginated listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number.
    pub index: usize,
    /// Items per page.
    pub size: usize,
}
impl PageRequest {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size: size.max(1) }
    }

    pub fn offset(&self) -> usize {
        self.index.saturating_mul(self.size)
    }
}

/// One page of catalog results plus the total the catalog reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<ResolvedItem>,
    /// Total number of matches across all pages.
    pub total: usize,
}

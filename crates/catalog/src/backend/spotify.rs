//! Spotify Web API catalog.
//!
//! Albums are the playable unit for every category except `playlist`, where
//! playlists are searched and looked up instead. Single tracks can still be
//! referenced directly with a `spotify:track:` URI (or an
//! `open.spotify.com/track/…` link).
//!
//! # Credentials
//!
//! Requests carry a bearer token from a shared [`TokenSource`]; for a
//! server-side jukebox that is normally backed by [`SpotifyCredentials`]
//! (the client-credentials grant). Expired tokens surface as
//! [`Unauthorized`](ErrorKind::Unauthorized) and are refreshed by
//! [`RetryingCatalog`](crate::backend::RetryingCatalog), not here.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{Category, ContentType, Page, PageRequest, ResolvedItem};
use crate::token::{AccessToken, TokenProvider, TokenSource};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const OPEN_URL_PREFIX: &str = "https://open.spotify.com/";

// =========================================================================
// Wire format
// =========================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    albums: Option<Paging<AlbumObject>>,
    playlists: Option<Paging<PlaylistObject>>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    // Spotify occasionally returns `null` entries in search results.
    #[serde(default = "Vec::new")]
    items: Vec<Option<T>>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    id: String,
    name: String,
    album_type: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    #[serde(default)]
    images: Option<Vec<ImageObject>>,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    owner: Option<OwnerObject>,
    #[serde(default)]
    images: Option<Vec<ImageObject>>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwnerObject {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

fn first_image(images: Option<Vec<ImageObject>>) -> Option<String> {
    images.and_then(|images| images.into_iter().next()).map(|image| image.url)
}

fn first_artist(artists: &[ArtistObject]) -> String {
    artists.first().map(|artist| artist.name.clone()).unwrap_or_default()
}

fn album_content_type(album_type: Option<&str>) -> ContentType {
    match album_type {
        Some("single") => ContentType::Single,
        Some("compilation") => ContentType::Compilation,
        _ => ContentType::Album,
    }
}

impl AlbumObject {
    fn into_item(self, category: Category) -> ResolvedItem {
        let content_type = album_content_type(self.album_type.as_deref());
        ResolvedItem::catalog(self.id, self.name, category)
            .with_artist(first_artist(&self.artists))
            .with_cover(first_image(self.images))
            .with_content_type(content_type)
    }
}

impl PlaylistObject {
    fn into_item(self, category: Category) -> ResolvedItem {
        let owner = self.owner.and_then(|owner| owner.display_name).unwrap_or_default();
        ResolvedItem::catalog(self.id, self.name, category)
            .with_artist(owner)
            .with_cover(first_image(self.images))
            .with_content_type(ContentType::Playlist)
    }
}

impl TrackObject {
    fn into_item(self, category: Category) -> ResolvedItem {
        let cover = self.album.and_then(|album| first_image(album.images));
        ResolvedItem::catalog(self.id, self.name, category)
            .with_artist(first_artist(&self.artists))
            .with_cover(cover)
            .with_content_type(ContentType::Track)
    }
}

impl<T> Paging<T> {
    fn into_page(self, category: Category, normalise: impl Fn(T, Category) -> ResolvedItem) -> Page {
        Page {
            items: self.items.into_iter().flatten().map(|item| normalise(item, category)).collect(),
            total: self.total,
        }
    }
}

impl SearchResponse {
    fn into_page(self, category: Category) -> Page {
        match (self.albums, self.playlists) {
            (Some(albums), _) => albums.into_page(category, AlbumObject::into_item),
            (None, Some(playlists)) => playlists.into_page(category, PlaylistObject::into_item),
            (None, None) => Page::default(),
        }
    }
}

// =========================================================================
// Item references
// =========================================================================

/// What a direct-lookup id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemRef<'a> {
    Album(&'a str),
    Playlist(&'a str),
    Track(&'a str),
}
impl<'a> ItemRef<'a> {
    /// Accepts bare ids, `spotify:<kind>:<id>` URIs and `open.spotify.com`
    /// links. Bare ids are playlists in the playlist category and albums
    /// everywhere else.
    fn parse(id: &'a str, category: Category) -> Self {
        let id = id.trim();
        let (kind, bare) = if let Some(rest) = id.strip_prefix("spotify:") {
            rest.split_once(':').unwrap_or(("", rest))
        } else if let Some(rest) = id.strip_prefix(OPEN_URL_PREFIX) {
            let rest = rest.split(['?', '#']).next().unwrap_or(rest);
            rest.split_once('/').unwrap_or(("", rest))
        } else {
            ("", id)
        };
        match kind {
            "track" => Self::Track(bare),
            "playlist" => Self::Playlist(bare),
            "album" => Self::Album(bare),
            _ if category == Category::Playlist => Self::Playlist(bare),
            _ => Self::Album(bare),
        }
    }
}

fn status_error(status: StatusCode, context: &str) -> Option<ErrorKind> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => ErrorKind::NotFound(context.to_string()),
        other => ErrorKind::Network(format!("{context}: HTTP {other}")),
    })
}

// =========================================================================
// Catalog
// =========================================================================

/// Spotify Web API catalog.
///
/// # Examples
///
/// ```no_run
/// use jukebox_catalog::backend::{SpotifyCatalog, SpotifyCredentials};
/// use jukebox_catalog::token::TokenSource;
/// use std::sync::Arc;
///
/// let http = reqwest::Client::new();
/// let credentials = SpotifyCredentials::new(http.clone(), "client-id", "client-secret");
/// let tokens = Arc::new(TokenSource::new(Arc::new(credentials)));
/// let catalog = SpotifyCatalog::new(http, tokens).with_market("DE".to_string());
/// ```
pub struct SpotifyCatalog {
    name: String,
    http: reqwest::Client,
    api_base_url: String,
    market: Option<String>,
    tokens: Arc<TokenSource>,
}
impl SpotifyCatalog {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        Self {
            name: "spotify".to_string(),
            http,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            market: None,
            tokens,
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Restrict results to what is playable in one market (ISO country code).
    pub fn with_market(mut self, market: impl Into<Option<String>>) -> Self {
        self.market = market.into().filter(|m| !m.trim().is_empty());
        self
    }

    fn paging_query(&self, page: PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", page.size.to_string()), ("offset", page.offset().to_string())];
        if let Some(market) = &self.market {
            query.push(("market", market.clone()));
        }
        query
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}", self.api_base_url, path);
        tracing::trace!(catalog = %self.name, path, "Catalog request");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token.secret())
            .query(query)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(path.to_string()))?;
        if let Some(kind) = status_error(response.status(), path) {
            exn::bail!(kind);
        }
        response.json::<T>().await.or_raise(|| ErrorKind::InvalidResponse(path.to_string()))
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_by_text(&self, query: &str, category: Category, page: PageRequest) -> Result<Page> {
        let kind = if category == Category::Playlist { "playlist" } else { "album" };
        let mut params = vec![("q", query.to_string()), ("type", kind.to_string())];
        params.extend(self.paging_query(page));
        let response: SearchResponse = self.get("search", &params).await?;
        Ok(response.into_page(category))
    }

    async fn search_by_artist(&self, artist_id: &str, category: Category, page: PageRequest) -> Result<Page> {
        let mut params = vec![("include_groups", "album,single".to_string())];
        params.extend(self.paging_query(page));
        let response: Paging<AlbumObject> = self.get(&format!("artists/{}/albums", artist_id.trim()), &params).await?;
        Ok(response.into_page(category, AlbumObject::into_item))
    }

    async fn lookup_by_id(&self, id: &str, category: Category) -> Result<ResolvedItem> {
        let market: Vec<(&str, String)> = self.market.iter().map(|m| ("market", m.clone())).collect();
        match ItemRef::parse(id, category) {
            ItemRef::Album(id) => {
                let album: AlbumObject = self.get(&format!("albums/{id}"), &market).await?;
                Ok(album.into_item(category))
            },
            ItemRef::Playlist(id) => {
                let playlist: PlaylistObject = self.get(&format!("playlists/{id}"), &market).await?;
                Ok(playlist.into_item(category))
            },
            ItemRef::Track(id) => {
                let track: TrackObject = self.get(&format!("tracks/{id}"), &market).await?;
                Ok(track.into_item(category))
            },
        }
    }
}

// =========================================================================
// Credentials
// =========================================================================

/// Client-credentials grant against the Spotify accounts service.
pub struct SpotifyCredentials {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}
impl SpotifyCredentials {
    pub fn new(http: reqwest::Client, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

#[async_trait]
impl TokenProvider for SpotifyCredentials {
    async fn refresh_access_token(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .or_raise(|| ErrorKind::Network(self.token_url.clone()))?;
        let status = response.status();
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            exn::bail!(ErrorKind::Credentials(format!("token endpoint answered HTTP {status}")));
        }
        if let Some(kind) = status_error(status, "token") {
            exn::bail!(kind);
        }
        let token: TokenResponse =
            response.json().await.or_raise(|| ErrorKind::InvalidResponse(self.token_url.clone()))?;
        tracing::info!(expires_in = token.expires_in, "Obtained catalog access token");
        Ok(AccessToken::new(token.access_token, Duration::from_secs(token.expires_in)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaSource;
    use rstest::rstest;

    const ALBUM_SEARCH: &str = r#"{
        "albums": {
            "total": 2,
            "items": [
                {
                    "id": "1a",
                    "name": "Folge 1: Das Zirkuspferd",
                    "album_type": "album",
                    "artists": [{"name": "Benjamin Blümchen"}],
                    "images": [{"url": "https://i.scdn.co/large.jpg"}, {"url": "https://i.scdn.co/small.jpg"}]
                },
                null,
                {
                    "id": "2b",
                    "name": "Lied",
                    "album_type": "single",
                    "artists": [],
                    "images": []
                }
            ]
        }
    }"#;

    const PLAYLIST_SEARCH: &str = r#"{
        "playlists": {
            "total": 1,
            "items": [
                {"id": "p1", "name": "Kinderlieder", "owner": {"display_name": "Spotify"}, "images": null}
            ]
        }
    }"#;

    #[test]
    fn test_album_search_normalisation() {
        let response: SearchResponse = serde_json::from_str(ALBUM_SEARCH).unwrap();
        let page = response.into_page(Category::Audiobook);
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        let first = &page.items[0];
        assert_eq!(first.id.as_deref(), Some("1a"));
        assert_eq!(first.artist, "Benjamin Blümchen");
        assert_eq!(first.cover.as_deref(), Some("https://i.scdn.co/large.jpg"));
        assert_eq!(first.category, Category::Audiobook);
        assert_eq!(first.source, MediaSource::Catalog);
        assert_eq!(first.content_type, Some(ContentType::Album));
        let second = &page.items[1];
        assert_eq!(second.artist, "");
        assert_eq!(second.cover, None);
        assert_eq!(second.content_type, Some(ContentType::Single));
    }

    #[test]
    fn test_playlist_search_normalisation() {
        let response: SearchResponse = serde_json::from_str(PLAYLIST_SEARCH).unwrap();
        let page = response.into_page(Category::Playlist);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].artist, "Spotify");
        assert_eq!(page.items[0].cover, None);
        assert_eq!(page.items[0].content_type, Some(ContentType::Playlist));
    }

    #[test]
    fn test_track_normalisation() {
        let track: TrackObject = serde_json::from_str(
            r#"{"id": "t1", "name": "Song", "artists": [{"name": "Singer"}],
                "album": {"id": "a1", "name": "Record", "images": [{"url": "cover.jpg"}]}}"#,
        )
        .unwrap();
        let item = track.into_item(Category::Music);
        assert_eq!(item.title, "Song");
        assert_eq!(item.cover.as_deref(), Some("cover.jpg"));
        assert_eq!(item.content_type, Some(ContentType::Track));
    }

    #[rstest]
    #[case("4aawyAB9vmqN3uQ7FjRGTy", Category::Music, ItemRef::Album("4aawyAB9vmqN3uQ7FjRGTy"))]
    #[case("37i9dQZF1DX", Category::Playlist, ItemRef::Playlist("37i9dQZF1DX"))]
    #[case("spotify:track:abc", Category::Music, ItemRef::Track("abc"))]
    #[case("spotify:album:abc", Category::Playlist, ItemRef::Album("abc"))]
    #[case("spotify:playlist:xyz", Category::Audiobook, ItemRef::Playlist("xyz"))]
    #[case("https://open.spotify.com/album/abc?si=123", Category::Music, ItemRef::Album("abc"))]
    #[case("https://open.spotify.com/track/t9", Category::Audiobook, ItemRef::Track("t9"))]
    fn test_item_ref_parse(#[case] id: &str, #[case] category: Category, #[case] expected: ItemRef<'_>) {
        assert_eq!(ItemRef::parse(id, category), expected);
    }

    #[rstest]
    #[case(StatusCode::OK, None)]
    #[case(StatusCode::TOO_MANY_REQUESTS, Some(ErrorKind::RateLimited))]
    #[case(StatusCode::UNAUTHORIZED, Some(ErrorKind::Unauthorized))]
    #[case(StatusCode::NOT_FOUND, Some(ErrorKind::NotFound("albums/x".to_string())))]
    #[case(StatusCode::BAD_GATEWAY, Some(ErrorKind::Network("albums/x: HTTP 502 Bad Gateway".to_string())))]
    fn test_status_error(#[case] status: StatusCode, #[case] expected: Option<ErrorKind>) {
        assert_eq!(status_error(status, "albums/x"), expected);
    }
}

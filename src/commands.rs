//! Command handlers. Every handler prints its result to stdout as JSON.

use jukebox_cache::CategoryCache;
use jukebox_catalog::CatalogHandle;
use jukebox_catalog::backend::{RetryingCatalog, SpotifyCatalog, SpotifyCredentials};
use jukebox_catalog::models::{Category, ClientId, RawMediaEntry};
use jukebox_catalog::token::TokenSource;
use jukebox_config::Config;
use jukebox_library::entries::{EntrySource, JsonFileEntries};
use jukebox_library::group::media_for_artist;
use jukebox_library::{Resolver, Session, SessionOptions, search_catalog};
use miette::{IntoDiagnostic, miette};
use serde::Serialize;
use std::sync::Arc;

/// Turn an error tree into a diagnostic, keeping the whole tree.
pub fn report<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    miette!("{err:?}")
}

fn print_json(value: &impl Serialize) -> miette::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn catalog(config: &Config) -> miette::Result<CatalogHandle> {
    let (client_id, client_secret) = config.catalog.credentials().ok_or_else(|| {
        miette!("catalog credentials missing: set JUKEBOX_CATALOG__CLIENT_ID and JUKEBOX_CATALOG__CLIENT_SECRET")
    })?;
    let http = reqwest::Client::builder().timeout(config.catalog.request_timeout()).build().into_diagnostic()?;
    let credentials =
        SpotifyCredentials::new(http.clone(), client_id, client_secret).with_token_url(&config.catalog.token_url);
    let tokens = Arc::new(TokenSource::new(Arc::new(credentials)));
    let spotify = SpotifyCatalog::new(http, tokens.clone())
        .with_api_base_url(&config.catalog.api_base_url)
        .with_market(config.catalog.market.clone());
    Ok(Arc::new(RetryingCatalog::new(Arc::new(spotify), config.retry.policy()).with_tokens(tokens)))
}

fn entries(config: &Config) -> JsonFileEntries {
    JsonFileEntries::new(&config.library.data_dir)
}

fn session(config: &Config, client: &str) -> miette::Result<Session> {
    let resolver = Resolver::new(catalog(config)?).with_placeholder_cover(&config.library.placeholder_cover);
    let options = SessionOptions {
        preload_stagger: config.cache.preload_stagger(),
        ..SessionOptions::default()
    };
    Ok(Session::with_options(
        ClientId::from(client),
        Arc::new(entries(config)),
        resolver,
        Arc::new(CategoryCache::new(config.cache.ttl())),
        options,
    ))
}

pub async fn entries_list(config: &Config, client: &str) -> miette::Result<()> {
    let list = entries(config).list_raw_entries(&ClientId::from(client)).await.map_err(report)?;
    print_json(&list)
}

pub async fn entries_add(config: &Config, client: &str, json: &str) -> miette::Result<()> {
    let entry: RawMediaEntry = serde_json::from_str(json).into_diagnostic()?;
    let store = entries(config);
    let client = ClientId::from(client);
    store.add_raw_entry(&client, entry).await.map_err(report)?;
    print_json(&store.list_raw_entries(&client).await.map_err(report)?)
}

pub async fn entries_delete(config: &Config, client: &str, index: usize) -> miette::Result<()> {
    let removed = entries(config).delete_raw_entry(&ClientId::from(client), index).await.map_err(report)?;
    print_json(&removed)
}

pub async fn media(config: &Config, client: &str, category: Category, artist: Option<&str>) -> miette::Result<()> {
    let session = session(config, client)?;
    session.set_category(category);
    let view = session.publish_media().await.map_err(report)?;
    match artist {
        Some(artist) => print_json(&media_for_artist(&view.value, artist)),
        None => print_json(&view),
    }
}

pub async fn artists(config: &Config, client: &str, category: Category) -> miette::Result<()> {
    let session = session(config, client)?;
    session.set_category(category);
    print_json(&session.publish_artists().await.map_err(report)?)
}

pub async fn search(config: &Config, query: &str, category: Category, page: usize) -> miette::Result<()> {
    let catalog = catalog(config)?;
    print_json(&search_catalog(catalog.as_ref(), query, category, page).await.map_err(report)?)
}

pub async fn preload(config: &Config, client: &str) -> miette::Result<()> {
    let session = session(config, client)?;
    match session.preload_all().await.map_err(report)? {
        Some(report) => print_json(&report),
        None => Err(miette!("a preload sweep is already running for {client}")),
    }
}

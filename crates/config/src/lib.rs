//! Layered configuration.
//!
//! Values are merged in three layers, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional file (`.toml`, `.yaml`/`.yml` or `.json`). Without an
//!    explicit path, `<config dir>/jukebox/config.toml` is used if it exists.
//! 3. Environment variables prefixed `JUKEBOX_`, with `__` separating nested
//!    keys (`JUKEBOX_RETRY__MAX_ATTEMPTS=3`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use jukebox_catalog::backend::{DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL};
use jukebox_catalog::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "JUKEBOX_";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PLACEHOLDER_COVER: &str = "assets/images/nocover.png";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "jukebox")
}

/// `<config dir>/jukebox/config.toml` for the current user.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoConfigDirectory)?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("clients"))
        .unwrap_or_else(|| PathBuf::from("clients"))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub token_url: String,
    /// ISO 3166-1 alpha-2 country code results are restricted to.
    pub market: Option<String>,
    pub request_timeout_secs: u64,
}
impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            market: None,
            request_timeout_secs: 15,
        }
    }
}
impl CatalogConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Both halves of the client credentials, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let secret = self.client_secret.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((id, secret))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
}
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: DEFAULT_BASE_DELAY.as_secs(),
            max_delay_secs: DEFAULT_MAX_DELAY.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.max_delay_secs),
            self.max_attempts,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Delay between categories during the warm-all sweep.
    pub preload_stagger_ms: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            preload_stagger_ms: 1000,
        }
    }
}
impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn preload_stagger(&self) -> Duration {
        Duration::from_millis(self.preload_stagger_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding one raw-entry file per client.
    pub data_dir: PathBuf,
    pub placeholder_cover: String,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            placeholder_cover: DEFAULT_PLACEHOLDER_COVER.to_string(),
        }
    }
}

impl Config {
    /// Load defaults, the config file and the environment, then validate.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and silently skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::Missing(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => match default_config_path() {
                Ok(default) if default.exists() => Some(default),
                Ok(_) => None,
                Err(err) => {
                    let kind: &ErrorKind = &err;
                    tracing::debug!(error = %kind, "No default configuration location");
                    None
                },
            },
        };
        let config = Self::from_figment(Self::figment(file.as_deref())?)?;
        tracing::debug!(file = ?file, "Configuration loaded");
        Ok(config)
    }

    /// The merged provider chain, without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.base_delay_secs > self.retry.max_delay_secs {
            exn::bail!(ErrorKind::Invalid(
                "retry.base_delay_secs must not exceed retry.max_delay_secs".to_string()
            ));
        }
        if self.cache.ttl_secs == 0 {
            exn::bail!(ErrorKind::Invalid("cache.ttl_secs must be positive".to_string()));
        }
        Ok(())
    }
}

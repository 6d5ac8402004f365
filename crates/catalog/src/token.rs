//! Access-token handling for catalogs that need credentials.
//!
//! [`TokenProvider`] is the credential collaborator: something that can mint a
//! new access token. [`TokenSource`] sits in front of it, caches the current
//! token, and makes sure concurrent refreshes collapse into a single request
//! to the provider.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use jukebox_asyncutils::SingleFlight;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// Tokens this close to their expiry are treated as already expired.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A bearer token and the moment it stops being valid.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Instant,
}
impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// `true` while the token is comfortably inside its lifetime.
    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints access tokens (the credential collaborator).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn refresh_access_token(&self) -> Result<AccessToken>;
}

/// Caching, single-flight front for a [`TokenProvider`].
///
/// Every caller that asks for a refresh while one is already pending awaits
/// that same request and receives the same token; the provider is never hit
/// twice concurrently.
pub struct TokenSource {
    provider: Arc<dyn TokenProvider>,
    current: RwLock<Option<AccessToken>>,
    refresh: SingleFlight<std::result::Result<AccessToken, ErrorKind>>,
}
impl TokenSource {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
            refresh: SingleFlight::new(),
        }
    }

    /// The cached token if it is still fresh, otherwise a refreshed one.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let cached = self.current.read().unwrap_or_else(PoisonError::into_inner).clone();
        match cached {
            Some(token) if token.is_fresh() => Ok(token),
            _ => self.refresh().await,
        }
    }

    /// Obtain a new token from the provider, joining any refresh that is
    /// already in flight.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AccessToken> {
        let provider = Arc::clone(&self.provider);
        let outcome = self
            .refresh
            .run(move || async move { provider.refresh_access_token().await.map_err(|err| (*err).clone()) })
            .await;
        match outcome {
            Ok(token) => {
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
                tracing::debug!("Catalog access token refreshed");
                Ok(token)
            },
            Err(kind) => {
                tracing::warn!(error = %kind, "Catalog access token refresh failed");
                Err(exn::Exn::from(kind))
            },
        }
    }
}

//! # Client Configuration
//!
//! Builder-based configuration for the music client core.
//!
//! ## Overview
//!
//! `ClientConfig` carries the OAuth client credentials, the service base
//! URLs, the redirect URI registered for the app's custom scheme, the
//! database location, and the two host bridges the core cannot do without:
//!
//! - `HttpClient` - every network call
//! - `SecureStore` - the persisted access/refresh token pair
//!
//! With the `desktop-shims` feature the builder falls back to
//! `ReqwestHttpClient` and `KeyringSecureStore` when a bridge is not supplied.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::builder()
//!     .client_credentials("my-client-id", "my-client-secret")
//!     .database_url("sqlite:/path/to/musicpod.db")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .build()?;
//! ```
//!
//! Validation fails fast with `Error::Config` or `Error::CapabilityMissing`.

use crate::error::{Error, Result};
use bridge_traits::{http::HttpClient, storage::SecureStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1/";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com/";
pub const DEFAULT_REDIRECT_URI: &str = "musicpodapp://callback";
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-recently-played",
    "user-library-read",
    "user-top-read",
    "playlist-read-private",
    "playlist-read-collaborative",
];
pub const IN_MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Fully validated configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret, sent only to the token endpoint
    pub client_secret: String,
    /// Catalog service root, always ending in `/`
    pub api_base_url: String,
    /// Accounts service root, always ending in `/`
    pub accounts_base_url: String,
    /// Redirect URI registered for the app's custom scheme
    pub redirect_uri: String,
    /// Requested OAuth scopes
    pub scopes: Vec<String>,
    /// sqlx SQLite connection URL
    pub database_url: String,
    /// Per-request timeout applied by the catalog fetcher
    pub http_timeout: Duration,
    /// Event bus buffer per subscriber
    pub event_buffer_size: usize,
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Scheme part of the redirect URI (`musicpodapp` by default).
    pub fn redirect_scheme(&self) -> Option<String> {
        Url::parse(&self.redirect_uri)
            .ok()
            .map(|url| url.scheme().to_string())
    }

    /// Scopes joined the way the authorize endpoint expects them.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Checks credentials, URLs and numeric limits.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config("Client secret cannot be empty".to_string()));
        }

        validate_base_url("API base URL", &self.api_base_url)?;
        validate_base_url("Accounts base URL", &self.accounts_base_url)?;

        let redirect = Url::parse(&self.redirect_uri)
            .map_err(|e| Error::Config(format!("Invalid redirect URI: {}", e)))?;
        if redirect.scheme().is_empty() {
            return Err(Error::Config("Redirect URI must carry a scheme".to_string()));
        }

        if self.scopes.is_empty() {
            return Err(Error::Config("At least one OAuth scope is required".to_string()));
        }

        if self.database_url.trim().is_empty() {
            return Err(Error::Config("Database URL cannot be empty".to_string()));
        }

        if self.http_timeout.is_zero() {
            return Err(Error::Config("HTTP timeout must be greater than zero".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config("Event buffer size must be greater than zero".to_string()));
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("accounts_base_url", &self.accounts_base_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("database_url", &self.database_url)
            .field("http_timeout", &self.http_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

fn validate_base_url(label: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("Invalid {}: {}", label, e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::Config(format!("{} must be http(s): {}", label, value)));
    }
    if !value.ends_with('/') {
        return Err(Error::Config(format!("{} must end with '/': {}", label, value)));
    }
    Ok(())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required for every catalog call. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform's HTTP stack."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    Ok(Arc::new(KeyringSecureStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "A SecureStore implementation is required to persist tokens. \
                 Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore. \
                 Mobile: inject Keychain/Keystore-backed storage."
            .to_string(),
    })
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base_url: Option<String>,
    accounts_base_url: Option<String>,
    redirect_uri: Option<String>,
    scopes: Option<Vec<String>>,
    database_url: Option<String>,
    http_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
}

impl ClientConfigBuilder {
    pub fn client_credentials(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self.client_secret = Some(secret.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn accounts_base_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_base_url = Some(url.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// sqlx URL, e.g. `sqlite:/path/musicpod.db`. Defaults to in-memory.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when credentials are missing or a value is invalid
    /// - `Error::CapabilityMissing` when a bridge is missing and no desktop
    ///   default is compiled in
    pub fn build(self) -> Result<ClientConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config(
                "Client credentials are required. Use .client_credentials() to set them."
                    .to_string(),
            )
        })?;
        let client_secret = self.client_secret.unwrap_or_default();
        let http_timeout = self.http_timeout.unwrap_or(Duration::from_secs(30));

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(http_timeout)?,
        };
        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = ClientConfig {
            client_id,
            client_secret,
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            accounts_base_url: self
                .accounts_base_url
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_BASE_URL.to_string()),
            redirect_uri: self
                .redirect_uri
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            scopes: self
                .scopes
                .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
            database_url: self
                .database_url
                .unwrap_or_else(|| IN_MEMORY_DATABASE_URL.to_string()),
            http_timeout,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
        };

        config.validate()?;
        Ok(config)
    }
}

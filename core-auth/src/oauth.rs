//! OAuth 2.0 authorization-code flow against the accounts service
//!
//! # Overview
//!
//! [`OAuthClient`] handles the three network-facing steps of the flow:
//! - Building the authorization URL the host opens in a browser
//! - Parsing the redirect back into the app's custom scheme
//! - Exchanging a code for tokens and refreshing the access token
//!
//! The token endpoint authenticates the client with HTTP Basic credentials
//! and takes a form-encoded body.
//!
//! # Security
//!
//! - A random `state` value is attached to every authorization URL
//! - Codes and tokens are never logged
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthClient, OAuthConfig, AuthorizationState};
//! use std::sync::Arc;
//!
//! # fn example(http_client: Arc<dyn bridge_traits::HttpClient>) -> core_auth::Result<()> {
//! let config = OAuthConfig {
//!     client_id: "client-id".to_string(),
//!     client_secret: "client-secret".to_string(),
//!     accounts_base_url: "https://accounts.spotify.com/".to_string(),
//!     redirect_uri: "musicpodapp://callback".to_string(),
//!     scopes: vec!["user-top-read".to_string()],
//! };
//! let client = OAuthClient::new(config, http_client);
//! let state = AuthorizationState::generate();
//! let url = client.build_auth_url(&state)?;
//! // Open `url` in the system browser...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::TokenResponse;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::config::ClientConfig;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Static OAuth client settings.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Base of the accounts service, with a trailing slash
    pub accounts_base_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            accounts_base_url: config.accounts_base_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&self.accounts_base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid accounts URL: {}", e)))
    }

    fn redirect_scheme(&self) -> Result<String> {
        Url::parse(&self.redirect_uri)
            .map(|u| u.scheme().to_string())
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid redirect URI: {}", e)))
    }
}

/// Random `state` value bound to one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState(String);

impl AuthorizationState {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Parameters carried by the redirect back into the app.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: String,
    pub state: Option<String>,
}

impl std::fmt::Debug for AuthorizationCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCallback")
            .field("code", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Serialize)]
struct CodeGrant<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

/// Authorization-code flow client
pub struct OAuthClient {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the URL the host opens to start authorization.
    pub fn build_auth_url(&self, state: &AuthorizationState) -> Result<String> {
        let mut url = self.config.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state.as_str());

        debug!(scopes = self.config.scopes.len(), "Built authorization URL");
        Ok(url.into())
    }

    /// Parse a redirect URL.
    ///
    /// The scheme must match the configured redirect URI. An `error` query
    /// parameter means the user declined.
    pub fn parse_callback(&self, callback_url: &str) -> Result<AuthorizationCallback> {
        let url = Url::parse(callback_url)
            .map_err(|e| AuthError::InvalidCallback(format!("Malformed URL: {}", e)))?;

        let expected = self.config.redirect_scheme()?;
        if url.scheme() != expected {
            return Err(AuthError::InvalidCallback(format!(
                "Unexpected scheme '{}'",
                url.scheme()
            )));
        }

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            warn!(error = %error, "Authorization was not granted");
            return Err(AuthError::AuthorizationDenied(error));
        }

        match code {
            Some(code) if !code.is_empty() => Ok(AuthorizationCallback { code, state }),
            _ => Err(AuthError::InvalidCallback(
                "Missing authorization code".to_string(),
            )),
        }
    }

    /// Exchange an authorization code for an access and refresh token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let grant = CodeGrant {
            grant_type: "authorization_code",
            code,
            redirect_uri: &self.config.redirect_uri,
        };

        debug!("Exchanging authorization code for tokens");
        let response = self.post_token_request(&grant).await?;

        if !response.is_success() {
            let status = response.status;
            let message = error_description(&response);
            warn!(status = status, error = %message, "Token exchange failed");
            return Err(AuthError::ExchangeFailed { status, message });
        }

        let tokens = parse_token_response(&response)?;
        if tokens.refresh_token.is_none() {
            return Err(AuthError::InvalidTokenResponse(
                "Authorization code grant returned no refresh token".to_string(),
            ));
        }

        info!(expires_in = ?tokens.expires_in, "Authorization code exchanged");
        Ok(tokens)
    }

    /// Request a new access token.
    ///
    /// Called once per refresh; transport failures come back as
    /// `AuthError::Network` and a rejected grant as `AuthError::RefreshRejected`.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let grant = RefreshGrant {
            grant_type: "refresh_token",
            refresh_token,
        };

        debug!("Refreshing access token");
        let response = self.post_token_request(&grant).await?;

        if !response.is_success() {
            let status = response.status;
            let message = error_description(&response);
            warn!(status = status, error = %message, "Refresh token rejected");
            return Err(AuthError::RefreshRejected { status, message });
        }

        let tokens = parse_token_response(&response)?;
        info!(expires_in = ?tokens.expires_in, "Access token refreshed");
        Ok(tokens)
    }

    async fn post_token_request<T: Serialize>(&self, grant: &T) -> Result<HttpResponse> {
        let url = self.config.endpoint("api/token")?;
        let request = HttpRequest::new(HttpMethod::Post, url.as_str())
            .basic_auth(&self.config.client_id, &self.config.client_secret)
            .form(grant)
            .map_err(|e| AuthError::InvalidConfig(format!("Failed to encode grant: {}", e)))?;

        self.http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }
}

fn parse_token_response(response: &HttpResponse) -> Result<TokenResponse> {
    serde_json::from_slice(&response.body)
        .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))
}

/// `error_description` or `error` from an OAuth error body, falling back to
/// the raw text.
fn error_description(response: &HttpResponse) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        for field in ["error_description", "error"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    response
        .text()
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

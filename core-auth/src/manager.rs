//! # Session Manager
//!
//! Owns the access/refresh token pair and the session state machine.
//!
//! ## Overview
//!
//! - Starts the authorization-code flow and completes it from the redirect
//! - Restores a persisted session on launch
//! - Hands out access tokens to the fetcher as [`TokenLease`]s
//! - Refreshes after a 401, one refresh at a time
//! - Emits [`AuthEvent`]s on every transition
//!
//! ## Single-flight refresh
//!
//! Every successful exchange or refresh bumps a generation counter. A caller
//! that hit a 401 passes back the lease it used. Refreshes are serialized on
//! a mutex; once a caller holds it, a lease from an older generation means
//! someone else already refreshed and the current token is returned as is.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::SessionManager;
//! use core_runtime::{ClientConfig, EventBus};
//!
//! # async fn example(config: ClientConfig) -> core_auth::Result<()> {
//! let manager = SessionManager::from_config(&config, EventBus::new(100));
//! if !manager.restore().await? {
//!     let url = manager.authorize_url().await?;
//!     // open `url`, then feed the redirect back in:
//!     manager.handle_callback("musicpodapp://callback?code=...").await?;
//! }
//! let lease = manager.access_token().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::{AuthorizationState, OAuthClient, OAuthConfig};
use crate::token_store::TokenStore;
use crate::types::{Credentials, SessionState, TokenLease};
use core_runtime::config::ClientConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, SignOutReason};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

struct SessionInner {
    state: SessionState,
    credentials: Option<Credentials>,
    /// Authorization code received from the redirect and not yet exchanged
    pending_code: Option<String>,
    generation: u64,
}

impl SessionInner {
    fn signed_out() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            credentials: None,
            pending_code: None,
            generation: 0,
        }
    }

    fn lease(&self) -> Option<TokenLease> {
        self.credentials
            .as_ref()
            .map(|c| TokenLease::new(c.access_token.clone(), self.generation))
    }
}

/// Session and token lifecycle manager.
pub struct SessionManager {
    oauth: OAuthClient,
    token_store: TokenStore,
    event_bus: EventBus,
    session: RwLock<SessionInner>,
    pending_state: Mutex<Option<AuthorizationState>>,
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(oauth: OAuthClient, token_store: TokenStore, event_bus: EventBus) -> Self {
        Self {
            oauth,
            token_store,
            event_bus,
            session: RwLock::new(SessionInner::signed_out()),
            pending_state: Mutex::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Build a manager from the client configuration's credentials, HTTP
    /// client and secure store.
    pub fn from_config(config: &ClientConfig, event_bus: EventBus) -> Self {
        let oauth = OAuthClient::new(
            OAuthConfig::from_client_config(config),
            config.http_client.clone(),
        );
        Self::new(oauth, TokenStore::new(config.secure_store.clone()), event_bus)
    }

    pub async fn state(&self) -> SessionState {
        self.session.read().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await.has_tokens()
    }

    /// Resume a persisted session. Returns `true` when tokens were found.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<bool> {
        let Some(credentials) = self.token_store.load().await? else {
            debug!("No persisted session");
            return Ok(false);
        };

        {
            let mut inner = self.session.write().await;
            inner.credentials = Some(credentials);
            inner.state = SessionState::Authenticated;
            inner.generation += 1;
        }

        info!("Restored persisted session");
        self.emit(AuthEvent::SignedIn);
        Ok(true)
    }

    /// Start an authorization attempt and return the URL to open.
    #[instrument(skip(self))]
    pub async fn authorize_url(&self) -> Result<String> {
        let state = AuthorizationState::generate();
        let url = self.oauth.build_auth_url(&state)?;
        *self.pending_state.lock().await = Some(state);
        info!("Authorization flow started");
        Ok(url)
    }

    /// Complete authorization from the redirect URL.
    ///
    /// The code is held as pending until the exchange finishes. A failed
    /// exchange discards it since codes are single-use.
    #[instrument(skip(self, callback_url))]
    pub async fn handle_callback(&self, callback_url: &str) -> Result<()> {
        let callback = match self.oauth.parse_callback(callback_url) {
            Ok(callback) => callback,
            Err(e) => {
                self.emit_error(&e);
                return Err(e);
            }
        };

        let expected = self.pending_state.lock().await.take();
        if let (Some(expected), Some(actual)) = (expected, callback.state.as_deref()) {
            if !expected.matches(actual) {
                warn!("Authorization state mismatch");
                let e = AuthError::StateMismatch;
                self.emit_error(&e);
                return Err(e);
            }
        }

        self.session.write().await.pending_code = Some(callback.code.clone());

        match self.exchange_pending_code(&callback.code).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.session.write().await.pending_code = None;
                self.emit_error(&e);
                Err(e)
            }
        }
    }

    async fn exchange_pending_code(&self, code: &str) -> Result<()> {
        let tokens = self.oauth.exchange_code(code).await?;
        let refresh_token = tokens.refresh_token.ok_or_else(|| {
            AuthError::InvalidTokenResponse("Missing refresh token".to_string())
        })?;
        let credentials = Credentials::new(tokens.access_token, refresh_token);

        self.token_store.save(&credentials).await?;

        {
            let mut inner = self.session.write().await;
            inner.credentials = Some(credentials);
            inner.pending_code = None;
            inner.state = SessionState::Authenticated;
            inner.generation += 1;
        }

        info!("Signed in");
        self.emit(AuthEvent::SignedIn);
        Ok(())
    }

    /// Current access token, or `NotAuthenticated`.
    pub async fn access_token(&self) -> Result<TokenLease> {
        self.session
            .read()
            .await
            .lease()
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Refresh after `stale` drew a 401.
    ///
    /// Only one refresh runs at a time. If the session moved past `stale`'s
    /// generation while waiting, the newer token is returned without another
    /// call. A rejected refresh token ends the session.
    #[instrument(skip(self, stale), fields(generation = stale.generation()))]
    pub async fn refresh_after_unauthorized(&self, stale: &TokenLease) -> Result<TokenLease> {
        let _refresh_guard = self.refresh_lock.lock().await;

        let refresh_token = {
            let mut guard = self.session.write().await;
            let inner = &mut *guard;
            match &inner.credentials {
                None => return Err(AuthError::NotAuthenticated),
                Some(c) if inner.generation != stale.generation() => {
                    debug!(current = inner.generation, "Token already refreshed");
                    return Ok(TokenLease::new(c.access_token.clone(), inner.generation));
                }
                Some(c) => {
                    let token = c.refresh_token.clone();
                    inner.state = SessionState::Refreshing;
                    token
                }
            }
        };

        self.emit(AuthEvent::TokenRefreshing);

        match self.oauth.refresh_access_token(&refresh_token).await {
            Ok(tokens) => {
                if let Err(e) = self.token_store.save_access_token(&tokens.access_token).await {
                    warn!(error = %e, "Failed to persist refreshed access token");
                }

                let lease = {
                    let mut guard = self.session.write().await;
                    let inner = &mut *guard;
                    let Some(credentials) = inner.credentials.as_mut() else {
                        return Err(AuthError::NotAuthenticated);
                    };
                    credentials.access_token = tokens.access_token;
                    inner.generation += 1;
                    inner.state = SessionState::Authenticated;
                    TokenLease::new(credentials.access_token.clone(), inner.generation)
                };

                self.emit(AuthEvent::TokenRefreshed {
                    expires_in: tokens.expires_in.unwrap_or_default(),
                });
                Ok(lease)
            }
            Err(e) if e.requires_login() => {
                warn!(error = %e, "Refresh failed; signing out");
                self.clear_session(SignOutReason::RefreshFailed).await;
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Refresh did not complete");
                {
                    let mut inner = self.session.write().await;
                    if inner.credentials.is_some() {
                        inner.state = SessionState::Authenticated;
                    }
                }
                self.emit_error(&e);
                Err(e)
            }
        }
    }

    /// End the session after a request stayed unauthorized past its retry.
    #[instrument(skip(self))]
    pub async fn force_sign_out(&self, reason: SignOutReason) {
        self.clear_session(reason).await;
    }

    /// Explicit logout.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");
        let cleared = self.token_store.clear().await;
        self.reset_memory().await;
        self.emit(AuthEvent::SignedOut {
            reason: SignOutReason::UserRequested,
        });
        cleared
    }

    async fn clear_session(&self, reason: SignOutReason) {
        if let Err(e) = self.token_store.clear().await {
            warn!(error = %e, "Failed to clear persisted tokens");
        }
        self.reset_memory().await;
        info!(?reason, "Session cleared");
        self.emit(AuthEvent::SignedOut { reason });
    }

    async fn reset_memory(&self) {
        {
            let mut inner = self.session.write().await;
            let generation = inner.generation;
            *inner = SessionInner::signed_out();
            // Keep counting so leases from the old session never match.
            inner.generation = generation + 1;
        }
        *self.pending_state.lock().await = None;
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }

    fn emit_error(&self, error: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: error.to_string(),
            recoverable: !error.requires_login(),
        });
    }
}

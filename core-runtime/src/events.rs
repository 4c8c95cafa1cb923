//! # Event Bus System
//!
//! Application-level notifications over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Two families of events flow through the bus:
//! - **Auth**: session transitions (signed in, refresh started/finished,
//!   forced sign-out). Hosts listen for `SignedOut` to route back to the login
//!   screen after a failed refresh.
//! - **Cache**: a domain finished a network round trip (`Refreshed`) or
//!   reported an error (`FetchFailed`).
//!
//! Row-level change notifications for list views do not travel here; they
//! are delivered synchronously by each entity store's observer registry.
//!
//! ```text
//! ┌──────────────┐    emit     ┌──────────┐   subscribe   ┌────────────┐
//! │ SessionMgr   ├───────────>│          ├──────────────>│ Host / UI  │
//! └──────────────┘            │ EventBus │               └────────────┘
//! ┌──────────────┐    emit     │          │   subscribe   ┌────────────┐
//! │ Coordinators ├───────────>│          ├──────────────>│ Logger     │
//! └──────────────┘            └──────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//! bus.emit(CoreEvent::Auth(AuthEvent::SignedIn)).ok();
//! assert_eq!(rx.try_recv().unwrap(), CoreEvent::Auth(AuthEvent::SignedIn));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};

/// Default per-subscriber buffer
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session and token lifecycle
    Auth(AuthEvent),
    /// Cache-or-fetch outcomes
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedOut { reason }) if *reason != SignOutReason::UserRequested => {
                EventSeverity::Warning
            }
            CoreEvent::Cache(CacheEvent::FetchFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Why the session ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit logout
    UserRequested,
    /// The refresh token was rejected
    RefreshFailed,
    /// A request was still unauthorized after a successful refresh
    Unauthorized,
}

/// Session lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Authorization code exchanged or persisted tokens restored
    SignedIn,
    /// Credentials cleared; the authorization flow must run again
    SignedOut { reason: SignOutReason },
    /// A refresh started after a 401
    TokenRefreshing,
    /// A new access token is in place
    TokenRefreshed {
        /// Lifetime reported by the token endpoint, in seconds
        expires_in: u64,
    },
    /// Authorization or exchange error
    AuthError { message: String, recoverable: bool },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SignedIn => "User signed in",
            AuthEvent::SignedOut { .. } => "User signed out",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

/// Cache-or-fetch outcome events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A domain repopulated its scope from the network
    Refreshed {
        /// Domain name, e.g. `home.new_releases`
        domain: String,
        /// Rows now in scope
        count: usize,
    },
    /// A domain fetch surfaced an error to the caller
    FetchFailed { domain: String, message: String },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Refreshed { .. } => "Cache refreshed from network",
            CacheEvent::FetchFailed { .. } => "Fetch failed",
        }
    }
}

/// Broadcast bus shared by every component.
///
/// Cloning is cheap; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls more than `capacity` events behind receives
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns an error if there are no active subscribers; callers that do
    /// not care discard it with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with an optional filter
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let bus = EventBus::default();
/// let auth_only = bus.stream().filter(|e| matches!(e, CoreEvent::Auth(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

//! # Event Bus System
//!
//! Lifecycle notifications for the player core, published over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! UI-facing state (transport state, now playing, connection status) lives in
//! `watch` channels owned by the session connection. The event bus is the
//! complementary log-style stream: every connection, catalog and playback
//! transition is announced once, in order, to every subscriber.
//!
//! ```text
//! ┌────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ SessionConn.   ├────────>│           ├────────────>│ Subscriber │
//! └────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ Catalog source ├────────>│  channel) ├────────────>│ Subscriber │
//! └────────────────┘         │           │             └────────────┘
//! ┌────────────────┐  emit   │           │
//! │ Orchestrator   ├────────>│           │
//! └────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.publish(CoreEvent::Catalog(CatalogEvent::Loading {
//!     uri: "https://example.com/catalog.json".to_string(),
//! }));
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Catalog loading");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Connection(ConnectionEvent),
    Catalog(CatalogEvent),
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Connection(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Connection(ConnectionEvent::ConnectionFailed { .. })
            | CoreEvent::Catalog(CatalogEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Connection(ConnectionEvent::NetworkError { .. }) => EventSeverity::Warning,
            CoreEvent::Connection(ConnectionEvent::Connected { .. })
            | CoreEvent::Catalog(CatalogEvent::Loaded { .. }) => EventSeverity::Info,
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

// ============================================================================
// Connection Events
// ============================================================================

/// Lifecycle of the connection to the playback engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConnectionEvent {
    /// Handshake with the engine started.
    Connecting {
        /// Engine identity being connected to.
        service: String,
    },
    /// Engine connected and browse root resolved.
    Connected {
        service: String,
        /// Browse id of the library root, empty if the root lookup failed.
        root_id: String,
    },
    /// Handshake failed.
    ConnectionFailed { service: String, message: String },
    /// Engine reported a connectivity failure for the current item.
    NetworkError { message: String },
    /// Connection torn down and state reset.
    Released { service: String },
}

impl ConnectionEvent {
    fn description(&self) -> &str {
        match self {
            ConnectionEvent::Connecting { .. } => "Connecting to playback engine",
            ConnectionEvent::Connected { .. } => "Connected to playback engine",
            ConnectionEvent::ConnectionFailed { .. } => "Playback engine connection failed",
            ConnectionEvent::NetworkError { .. } => "Playback network error",
            ConnectionEvent::Released { .. } => "Playback engine connection released",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Catalog loader transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    Loading { uri: String },
    Loaded { uri: String, item_count: usize },
    Failed { uri: String, message: String },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::Loading { .. } => "Catalog loading",
            CatalogEvent::Loaded { .. } => "Catalog loaded",
            CatalogEvent::Failed { .. } => "Catalog load failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Transport actions taken in response to play requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new queue was set and started.
    QueueStarted {
        media_id: String,
        queue_len: usize,
        start_index: usize,
    },
    Paused { media_id: String },
    Resumed { media_id: String },
    /// Ended item seeked back to its start.
    Restarted { media_id: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::QueueStarted { .. } => "Playback queue started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Restarted { .. } => "Playback restarted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clone freely; all clones feed the same channel. Slow subscribers receive
/// `RecvError::Lagged` instead of blocking producers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified per-subscriber buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, ignoring the absence of subscribers.
    pub fn publish(&self, event: CoreEvent) {
        if let Err(SendError(event)) = self.sender.send(event) {
            trace!(event = event.description(), "No subscribers for event");
        }
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let playback_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
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

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
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

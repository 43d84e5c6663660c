//! Playback session bridge traits.
//!
//! The playback engine (decoder, renderer, queue) lives outside the core,
//! usually in a background service. The core reaches it through a
//! [`SessionConnector`], which yields a connected [`MediaBrowser`]. The browser
//! exposes the browse tree, a custom command channel and the live [`Player`]
//! control surface. Engine callbacks are delivered as [`SessionEvent`] batches
//! on a bounded channel handed to the connector.

use crate::error::Result;
use crate::media::MediaItem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;

/// Browse id of the catalog root.
pub const MEDIA_ROOT_ID: &str = "/";

/// Result code reported by a successful custom command.
pub const RESULT_SUCCESS: i32 = 0;

/// Opaque key/value parameter bundle.
pub type Bundle = HashMap<String, String>;

/// Identity of the playback engine to connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken {
    /// Host-specific service identifier (e.g. a component name).
    pub service: String,
}

impl SessionToken {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.service)
    }
}

/// Transport lifecycle state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Kinds of change the engine reports in one callback batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerEvent {
    PlayWhenReadyChanged,
    PlaybackStateChanged,
    MediaItemTransition,
    MediaMetadataChanged,
    IsPlayingChanged,
    PositionDiscontinuity,
    TimelineChanged,
}

/// A batch of [`PlayerEvent`]s delivered together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerEvents(Vec<PlayerEvent>);

impl PlayerEvents {
    pub fn new(events: impl IntoIterator<Item = PlayerEvent>) -> Self {
        Self(events.into_iter().collect())
    }

    pub fn contains(&self, event: PlayerEvent) -> bool {
        self.0.contains(&event)
    }

    pub fn contains_any(&self, events: &[PlayerEvent]) -> bool {
        events.iter().any(|event| self.contains(*event))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Engine error codes surfaced through [`SessionEvent::PlayerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackErrorCode {
    Unspecified,
    RemoteError,
    IoUnspecified,
    IoNetworkConnectionFailed,
    IoNetworkConnectionTimeout,
    IoInvalidHttpContentType,
    IoBadHttpStatus,
    IoFileNotFound,
    IoNoPermission,
    IoCleartextNotPermitted,
    ParsingContainerMalformed,
    DecodingFailed,
    AudioTrackInitFailed,
    /// Vendor-specific code not mapped above.
    Other(i32),
}

/// Error reported by the engine for the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackException {
    pub code: PlaybackErrorCode,
    pub message: String,
}

impl PlaybackException {
    pub fn new(code: PlaybackErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Callback delivered by the engine to the connected core.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Player state changed; read the player for the fresh snapshot.
    Player(PlayerEvents),
    /// Player error changed; `None` clears a previous error.
    PlayerError(Option<PlaybackException>),
    /// The engine dropped the connection.
    Disconnected,
}

/// Sender end engines use to push [`SessionEvent`] batches.
pub type SessionEventSender = mpsc::Sender<SessionEvent>;

/// Named out-of-band command sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommand {
    pub name: String,
    pub extras: Bundle,
}

impl SessionCommand {
    pub fn new(name: impl Into<String>, extras: Bundle) -> Self {
        Self {
            name: name.into(),
            extras,
        }
    }
}

/// Asynchronous result of a [`SessionCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub result_code: i32,
    pub extras: Option<Bundle>,
}

impl SessionResult {
    pub fn success() -> Self {
        Self {
            result_code: RESULT_SUCCESS,
            extras: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code == RESULT_SUCCESS
    }
}

/// Live transport control surface.
///
/// Getters return the engine's current snapshot. Mutators are fire-and-forget;
/// their effect is observed through subsequent [`SessionEvent::Player`] batches.
pub trait Player: Send + Sync {
    fn playback_state(&self) -> PlayerState;

    fn play_when_ready(&self) -> bool;

    /// Duration of the current item in milliseconds, `None` when unset.
    fn duration_ms(&self) -> Option<u64>;

    fn current_media_item(&self) -> Option<MediaItem>;

    fn play(&self);

    fn pause(&self);

    /// Seek within the current item. `None` seeks to the default position.
    fn seek_to(&self, position_ms: Option<u64>);

    /// Replace the queue. `start_position_ms = None` lets the engine pick.
    fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize, start_position_ms: Option<u64>);

    fn prepare(&self);

    /// Buffering or ready with play-when-ready requested.
    fn is_playing(&self) -> bool {
        matches!(
            self.playback_state(),
            PlayerState::Buffering | PlayerState::Ready
        ) && self.play_when_ready()
    }

    /// Buffering or ready but not yet asked to play.
    fn is_play_enabled(&self) -> bool {
        matches!(
            self.playback_state(),
            PlayerState::Buffering | PlayerState::Ready
        ) && !self.play_when_ready()
    }

    fn is_ended(&self) -> bool {
        self.playback_state() == PlayerState::Ended
    }
}

/// Connected browse/control endpoint of the playback engine.
#[async_trait]
pub trait MediaBrowser: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Live control surface.
    fn player(&self) -> std::sync::Arc<dyn Player>;

    /// Root node of the browse tree.
    async fn library_root(&self) -> Result<MediaItem>;

    /// One page of children of `parent_id`.
    async fn children(&self, parent_id: &str, page: u32, page_size: u32)
        -> Result<Vec<MediaItem>>;

    /// Fully enriched item by id, `None` if unknown.
    async fn item(&self, media_id: &str) -> Result<Option<MediaItem>>;

    async fn send_custom_command(&self, command: SessionCommand, args: Bundle)
        -> Result<SessionResult>;

    /// Stop delivering events and drop engine resources.
    fn release(&self);
}

/// Resolves a [`SessionToken`] into a connected [`MediaBrowser`].
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Connect and start delivering engine callbacks on `events`.
    async fn connect(
        &self,
        token: &SessionToken,
        events: SessionEventSender,
    ) -> Result<std::sync::Arc<dyn MediaBrowser>>;
}

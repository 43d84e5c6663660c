//! # Host Bridge Traits
//!
//! Contracts between the player core and the things it does not own.
//!
//! ## Overview
//!
//! The core browses a remote catalog, keeps UI-facing state in sync with a
//! playback engine, and decides how "play" requests are applied. Everything
//! platform-specific is reached through the traits in this crate:
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Fetches catalog descriptors
//!
//! ### Playback engine
//! - [`SessionConnector`](session::SessionConnector) - Resolves an engine identity into a connection
//! - [`MediaBrowser`](session::MediaBrowser) - Browse tree, item lookup and custom commands
//! - [`Player`](session::Player) - Live transport control surface
//!
//! ### Presentation helpers
//! - [`ArtworkResolver`](artwork::ArtworkResolver) - Maps declared artwork URIs to servable ones
//! - [`LoggerSink`](logger::LoggerSink) - Forward structured logs to host logging
//!
//! The canonical [`MediaItem`](media::MediaItem) model lives here too, since
//! both the engine and the catalog speak it.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.

pub mod artwork;
pub mod error;
pub mod http;
pub mod logger;
pub mod media;
pub mod session;

pub use error::BridgeError;

pub use artwork::{ArtworkResolver, PassthroughArtworkResolver, ORIGINAL_ARTWORK_URI_KEY};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{FolderType, MediaItem, MediaMetadata, MIME_TYPE_AUDIO_MPEG};
pub use session::{
    Bundle, MediaBrowser, PlaybackErrorCode, PlaybackException, Player, PlayerEvent,
    PlayerEvents, PlayerState, SessionCommand, SessionConnector, SessionEvent,
    SessionEventSender, SessionResult, SessionToken, MEDIA_ROOT_ID, RESULT_SUCCESS,
};

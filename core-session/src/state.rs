//! Observable state published by a [`SessionConnection`](crate::SessionConnection).

use bridge_traits::{PlaybackErrorCode, Player, PlayerState};
use core_runtime::envelope::{Event, Resource};
use serde::{Deserialize, Serialize};

/// User-facing message attached to connectivity failures.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Couldn't connect to the server. Please check your internet connection.";

/// Snapshot of the engine's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransportState {
    pub state: PlayerState,
    pub play_when_ready: bool,
    /// `None` while the duration is unknown.
    pub duration_ms: Option<u64>,
}

impl TransportState {
    pub fn new(state: PlayerState, play_when_ready: bool, duration_ms: Option<u64>) -> Self {
        Self {
            state,
            play_when_ready,
            duration_ms,
        }
    }

    /// Reads a fresh snapshot from the live control surface.
    pub fn from_player(player: &dyn Player) -> Self {
        Self::new(
            player.playback_state(),
            player.play_when_ready(),
            player.duration_ms(),
        )
    }

    /// Buffering or ready, and asked to play. Never true while idle or ended.
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayerState::Buffering | PlayerState::Ready) && self.play_when_ready
    }

    pub fn is_prepared(&self) -> bool {
        self.state != PlayerState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// Payload of the network signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkStatus {
    Available,
    Unavailable,
}

/// Latest connection transition, `None` before the first one.
pub type ConnectionSignal = Option<Event<Resource<ConnectionStatus>>>;

/// Latest network transition, `None` until the engine reports anything.
pub type NetworkSignal = Option<Event<Resource<NetworkStatus>>>;

/// Engine error codes that mean "the network is the problem".
pub fn is_network_failure(code: PlaybackErrorCode) -> bool {
    matches!(
        code,
        PlaybackErrorCode::IoBadHttpStatus
            | PlaybackErrorCode::IoInvalidHttpContentType
            | PlaybackErrorCode::IoCleartextNotPermitted
            | PlaybackErrorCode::IoNetworkConnectionFailed
            | PlaybackErrorCode::IoNetworkConnectionTimeout
    )
}

pub(crate) fn connection_resource(status: ConnectionStatus, message: Option<String>) -> Resource<ConnectionStatus> {
    match status {
        ConnectionStatus::Connecting => Resource::loading(Some(status)),
        ConnectionStatus::Connected | ConnectionStatus::Disconnected => Resource::success(status),
        ConnectionStatus::Error => Resource::error(
            message.unwrap_or_else(|| "Connection to the playback engine failed".to_string()),
            Some(status),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [PlayerState; 4] = [
        PlayerState::Idle,
        PlayerState::Buffering,
        PlayerState::Ready,
        PlayerState::Ended,
    ];

    #[test]
    fn is_playing_truth_table() {
        for state in STATES {
            for play_when_ready in [false, true] {
                let transport = TransportState::new(state, play_when_ready, None);
                let expected = play_when_ready
                    && matches!(state, PlayerState::Buffering | PlayerState::Ready);
                assert_eq!(transport.is_playing(), expected, "{:?}/{}", state, play_when_ready);
            }
        }
    }

    #[test]
    fn default_is_idle_and_unprepared() {
        let transport = TransportState::default();
        assert_eq!(transport.state, PlayerState::Idle);
        assert!(!transport.is_prepared());
        assert!(!transport.is_playing());
        assert_eq!(transport.duration_ms, None);
    }

    #[test]
    fn network_failure_classification() {
        let network = [
            PlaybackErrorCode::IoBadHttpStatus,
            PlaybackErrorCode::IoInvalidHttpContentType,
            PlaybackErrorCode::IoCleartextNotPermitted,
            PlaybackErrorCode::IoNetworkConnectionFailed,
            PlaybackErrorCode::IoNetworkConnectionTimeout,
        ];
        for code in network {
            assert!(is_network_failure(code), "{:?}", code);
        }

        let other = [
            PlaybackErrorCode::Unspecified,
            PlaybackErrorCode::IoFileNotFound,
            PlaybackErrorCode::DecodingFailed,
            PlaybackErrorCode::Other(7001),
        ];
        for code in other {
            assert!(!is_network_failure(code), "{:?}", code);
        }
    }

    #[test]
    fn connection_resources_carry_status() {
        assert!(connection_resource(ConnectionStatus::Connecting, None).is_loading());
        assert!(connection_resource(ConnectionStatus::Connected, None).is_success());

        let failed = connection_resource(ConnectionStatus::Error, Some("refused".to_string()));
        assert!(failed.is_error());
        assert_eq!(failed.message.as_deref(), Some("refused"));
        assert_eq!(failed.data, Some(ConnectionStatus::Error));
    }
}

//! Connection lifecycle against the in-memory engine.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    MediaBrowser, MediaItem, PlayerEvent, PlayerEvents, PlayerState, SessionConnector,
    SessionEvent, SessionEventSender, SessionToken, MEDIA_ROOT_ID,
};
use core_session::testing::{fake_engine, FakeBrowser};
use core_session::{ConnectionStatus, SessionConnection, SessionOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Connector whose handshake completes only when the test allows it.
struct GatedConnector {
    browser: Arc<FakeBrowser>,
    gate: Arc<Notify>,
}

#[async_trait]
impl SessionConnector for GatedConnector {
    async fn connect(
        &self,
        _token: &SessionToken,
        _events: SessionEventSender,
    ) -> BridgeResult<Arc<dyn MediaBrowser>> {
        self.gate.notified().await;
        Ok(self.browser.clone())
    }
}

fn status_of(connection: &SessionConnection) -> Option<ConnectionStatus> {
    connection
        .connection_status()
        .borrow()
        .as_ref()
        .and_then(|event| event.peek_content().data)
}

#[tokio::test]
async fn closing_engine_channel_releases_connection() {
    let (_player, browser, connector) = fake_engine();
    let connection = SessionConnection::connect(
        SessionToken::new("music-service"),
        connector.clone(),
        SessionOptions::default(),
    );
    assert!(connection.wait_until_connected().await);

    let mut status = connection.connection_status();
    status.borrow_and_update();
    connector.close_events();

    tokio::time::timeout(Duration::from_secs(1), status.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status_of(&connection), Some(ConnectionStatus::Disconnected));
    assert!(browser.is_released());
    assert!(connection.player().is_none());
}

#[tokio::test]
async fn release_during_handshake_discards_late_connection() {
    let (_player, browser, _connector) = fake_engine();
    let gate = Arc::new(Notify::new());
    let connector = Arc::new(GatedConnector {
        browser: browser.clone(),
        gate: gate.clone(),
    });

    let connection = SessionConnection::connect(
        SessionToken::new("music-service"),
        connector,
        SessionOptions::default(),
    );
    tokio::task::yield_now().await;
    assert_eq!(status_of(&connection), Some(ConnectionStatus::Connecting));

    connection.release();
    gate.notify_one();
    tokio::task::yield_now().await;

    assert!(!connection.wait_until_connected().await);
    assert_eq!(status_of(&connection), Some(ConnectionStatus::Disconnected));
    assert!(connection.root_item().borrow().is_empty());
    assert!(connection.browse(MEDIA_ROOT_ID).await.is_empty());
}

#[tokio::test]
async fn events_after_release_publish_nothing() {
    let (player, _browser, connector) = fake_engine();
    let connection = SessionConnection::connect(
        SessionToken::new("music-service"),
        connector.clone(),
        SessionOptions::default(),
    );
    assert!(connection.wait_until_connected().await);

    connection.release();
    player.set_transport(PlayerState::Ready, true);
    player.set_current(Some(MediaItem::builder("late").playable(true).build()));

    // The listener has stopped; the engine's sends are simply dropped.
    connector
        .emit(SessionEvent::Player(PlayerEvents::new([
            PlayerEvent::PlaybackStateChanged,
            PlayerEvent::MediaItemTransition,
        ])))
        .await;
    tokio::task::yield_now().await;

    assert!(!connection.transport_snapshot().is_playing());
    assert!(connection.now_playing_snapshot().is_empty());
    assert!(connection.network_status().borrow().is_none());
}

#[tokio::test]
async fn registry_hands_out_one_connection() {
    let (_player, _browser, connector) = fake_engine();
    let token = SessionToken::new("music-service");

    let first = core_session::get_or_create(token.clone(), connector.clone(), SessionOptions::default());
    let again = core_session::get_or_create(
        SessionToken::new("other-service"),
        connector.clone(),
        SessionOptions::default(),
    );
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.token(), &token);

    first.release();
    assert!(core_session::current().is_none());
}

//! Orchestrator driving a real session connection over the in-memory engine.

use bridge_traits::{MediaItem, PlayerEvent, PlayerEvents, PlayerState, SessionEvent, SessionToken};
use core_playback::{PlayOptions, PlayOutcome, PlaybackOrchestrator};
use core_session::testing::{fake_engine, PlayerCall};
use core_session::{SessionConnection, SessionOptions};
use std::sync::Arc;
use std::time::Duration;

fn song(id: &str, playable: bool) -> MediaItem {
    MediaItem::builder(id).title(id).playable(playable).build()
}

#[tokio::test]
async fn scoped_play_then_retap_pauses() {
    let (player, browser, connector) = fake_engine();
    browser.set_children(
        "album-1",
        vec![song("A", false), song("B", true), song("C", true)],
    );

    let connection = SessionConnection::connect(
        SessionToken::new("music-service"),
        connector.clone(),
        SessionOptions::default(),
    );
    assert!(connection.wait_until_connected().await);

    let orchestrator = PlaybackOrchestrator::new(connection.clone());
    let outcome = orchestrator
        .play_media(&song("C", true), PlayOptions::new().in_scope("album-1"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        PlayOutcome::QueueStarted {
            queue_len: 2,
            start_index: 1
        }
    );
    assert_eq!(
        player.calls(),
        vec![
            PlayerCall::SetMediaItems {
                media_ids: vec!["B".to_string(), "C".to_string()],
                start_index: 1,
                start_position_ms: None,
            },
            PlayerCall::Prepare,
            PlayerCall::Play,
        ]
    );

    // Engine reports the new queue as playing.
    let mut now_playing = connection.now_playing();
    player.set_transport(PlayerState::Ready, true);
    player.set_current(Some(song("C", true)));
    connector
        .emit(SessionEvent::Player(PlayerEvents::new([
            PlayerEvent::MediaItemTransition,
        ])))
        .await;
    tokio::time::timeout(Duration::from_secs(1), now_playing.changed())
        .await
        .unwrap()
        .unwrap();

    let outcome = orchestrator
        .play_media(&song("C", true), PlayOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, PlayOutcome::Paused);
    assert_eq!(player.calls().last(), Some(&PlayerCall::Pause));
}

#[tokio::test]
async fn released_connection_ignores_requests() {
    let (player, _browser, connector) = fake_engine();
    let connection = SessionConnection::connect(
        SessionToken::new("music-service"),
        connector,
        SessionOptions::default(),
    );
    assert!(connection.wait_until_connected().await);
    connection.release();

    let orchestrator = Arc::new(PlaybackOrchestrator::new(connection));
    let outcome = orchestrator
        .launch_play_media(song("X", true), PlayOptions::new())
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, PlayOutcome::NoControlSurface);
    assert!(player.calls().is_empty());
}

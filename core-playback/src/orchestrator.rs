//! # Playback Orchestrator
//!
//! Decides what a "play this item" request means given the transport's
//! current state.
//!
//! ## Decision Procedure
//!
//! - **Same item, transport prepared**: toggle. Playing pauses (unless the
//!   caller opted out), play-enabled resumes, ended restarts from the default
//!   position. Any other state is logged and left alone.
//! - **Different item, or nothing prepared**: resolve a queue. With a parent
//!   scope the queue is that parent's playable children; without one, or when
//!   the scope has no playable children, it is just the requested item. The
//!   queue is set in one call, then prepared and played.
//!
//! Queue resolution is awaited before the transport is touched, so callers
//! never observe a half-applied request.

use crate::error::{PlaybackError, Result};
use crate::session::PlaybackSession;
use bridge_traits::{MediaItem, Player};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Per-request options for [`PlaybackOrchestrator::play_media`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOptions {
    /// Pause when the requested item is already playing. When `false`, a
    /// re-tap on the playing item does nothing.
    pub pause_then_playing: bool,
    /// Browse id whose playable children form the queue.
    pub parent_media_id: Option<String>,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            pause_then_playing: true,
            parent_media_id: None,
        }
    }
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the children of `parent_media_id` around the requested item.
    pub fn in_scope(mut self, parent_media_id: impl Into<String>) -> Self {
        self.parent_media_id = Some(parent_media_id.into());
        self
    }

    pub fn pause_then_playing(mut self, pause: bool) -> Self {
        self.pause_then_playing = pause;
        self
    }
}

/// What a play request did to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Not connected; nothing happened.
    NoControlSurface,
    Paused,
    /// Already playing and the caller asked not to pause.
    AlreadyPlaying,
    Resumed,
    /// Ended item seeked back to its start.
    Restarted,
    /// Same item loaded but the transport was in no actionable state.
    Unchanged,
    /// A new queue was set and started.
    QueueStarted { queue_len: usize, start_index: usize },
}

/// Applies play requests against a [`PlaybackSession`].
///
/// Requests run on the orchestrator's own cancellation scope; [`shutdown`]
/// drops in-flight requests before they touch the transport.
///
/// [`shutdown`]: PlaybackOrchestrator::shutdown
pub struct PlaybackOrchestrator {
    session: Arc<dyn PlaybackSession>,
    event_bus: Option<EventBus>,
    scope: CancellationToken,
}

impl PlaybackOrchestrator {
    pub fn new(session: Arc<dyn PlaybackSession>) -> Self {
        Self {
            session,
            event_bus: None,
            scope: CancellationToken::new(),
        }
    }

    /// Publish a [`PlaybackEvent`] for every transport action.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Applies a play request and reports what it did.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Cancelled`] if the orchestrator is shut down before
    /// the transport is touched.
    #[instrument(skip(self, item, options), fields(media_id = %item.media_id))]
    pub async fn play_media(&self, item: &MediaItem, options: PlayOptions) -> Result<PlayOutcome> {
        if self.scope.is_cancelled() {
            return Err(PlaybackError::Cancelled);
        }

        let Some(player) = self.session.control_surface() else {
            debug!("Play requested while disconnected");
            return Ok(PlayOutcome::NoControlSurface);
        };

        let current = self.session.now_playing();
        let is_prepared = player.playback_state() != bridge_traits::PlayerState::Idle;

        if is_prepared && item.media_id == current.media_id {
            return Ok(self.toggle(player.as_ref(), item, options.pause_then_playing));
        }

        let queue = self.resolve_queue(item, options.parent_media_id.as_deref()).await?;
        let start_index = queue
            .iter()
            .position(|candidate| candidate.media_id == item.media_id)
            .unwrap_or(0);
        let queue_len = queue.len();

        // Resolution may have outlived the orchestrator.
        if self.scope.is_cancelled() {
            return Err(PlaybackError::Cancelled);
        }

        player.set_media_items(queue, start_index, None);
        player.prepare();
        player.play();

        info!(queue_len, start_index, "Started new playback queue");
        self.emit(PlaybackEvent::QueueStarted {
            media_id: item.media_id.clone(),
            queue_len,
            start_index,
        });

        Ok(PlayOutcome::QueueStarted {
            queue_len,
            start_index,
        })
    }

    /// Runs [`play_media`](Self::play_media) in the background.
    ///
    /// The task resolves to [`PlaybackError::Cancelled`] if the orchestrator
    /// shuts down first.
    pub fn launch_play_media(
        self: &Arc<Self>,
        item: MediaItem,
        options: PlayOptions,
    ) -> Result<JoinHandle<Result<PlayOutcome>>> {
        let handle = Handle::try_current().map_err(|_| PlaybackError::NoRuntime)?;
        let orchestrator = Arc::clone(self);
        let scope = self.scope.clone();

        Ok(handle.spawn(async move {
            tokio::select! {
                _ = scope.cancelled() => Err(PlaybackError::Cancelled),
                outcome = orchestrator.play_media(&item, options) => outcome,
            }
        }))
    }

    /// Cancels in-flight and future requests.
    pub fn shutdown(&self) {
        self.scope.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.scope.is_cancelled()
    }

    fn toggle(&self, player: &dyn Player, item: &MediaItem, pause_then_playing: bool) -> PlayOutcome {
        let media_id = item.media_id.clone();

        if player.is_playing() {
            if !pause_then_playing {
                return PlayOutcome::AlreadyPlaying;
            }
            player.pause();
            self.emit(PlaybackEvent::Paused { media_id });
            PlayOutcome::Paused
        } else if player.is_play_enabled() {
            player.play();
            self.emit(PlaybackEvent::Resumed { media_id });
            PlayOutcome::Resumed
        } else if player.is_ended() {
            player.seek_to(None);
            self.emit(PlaybackEvent::Restarted { media_id });
            PlayOutcome::Restarted
        } else {
            warn!(
                state = ?player.playback_state(),
                play_when_ready = player.play_when_ready(),
                "Playable item selected but neither play nor pause are enabled"
            );
            PlayOutcome::Unchanged
        }
    }

    async fn resolve_queue(&self, item: &MediaItem, parent_id: Option<&str>) -> Result<Vec<MediaItem>> {
        let Some(parent_id) = parent_id else {
            return Ok(vec![item.clone()]);
        };

        let children = tokio::select! {
            _ = self.scope.cancelled() => return Err(PlaybackError::Cancelled),
            children = self.session.browse(parent_id) => children,
        };

        let playable: Vec<MediaItem> = children
            .into_iter()
            .filter(MediaItem::is_playable)
            .collect();

        if playable.is_empty() {
            debug!(parent_id, "Scope has no playable children, queueing the item alone");
            Ok(vec![item.clone()])
        } else {
            Ok(playable)
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(CoreEvent::Playback(event));
        }
    }
}

impl Drop for PlaybackOrchestrator {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::PlayerState;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Transport {}

        impl Player for Transport {
            fn playback_state(&self) -> PlayerState;
            fn play_when_ready(&self) -> bool;
            fn duration_ms(&self) -> Option<u64>;
            fn current_media_item(&self) -> Option<MediaItem>;
            fn play(&self);
            fn pause(&self);
            fn seek_to(&self, position_ms: Option<u64>);
            fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize, start_position_ms: Option<u64>);
            fn prepare(&self);
        }
    }

    mock! {
        Session {}

        #[async_trait]
        impl PlaybackSession for Session {
            fn control_surface(&self) -> Option<Arc<dyn Player>>;
            fn now_playing(&self) -> MediaItem;
            async fn browse(&self, parent_id: &str) -> Vec<MediaItem>;
        }
    }

    fn song(id: &str, playable: bool) -> MediaItem {
        MediaItem::builder(id).title(id).playable(playable).build()
    }

    fn transport(state: PlayerState, play_when_ready: bool) -> MockTransport {
        let mut player = MockTransport::new();
        player.expect_playback_state().return_const(state);
        player.expect_play_when_ready().return_const(play_when_ready);
        player
    }

    fn session_with(player: MockTransport, current: MediaItem) -> MockSession {
        let player: Arc<dyn Player> = Arc::new(player);
        let mut session = MockSession::new();
        session
            .expect_control_surface()
            .returning(move || Some(Arc::clone(&player)));
        session.expect_now_playing().return_const(current);
        session
    }

    fn orchestrator(session: MockSession) -> PlaybackOrchestrator {
        PlaybackOrchestrator::new(Arc::new(session))
    }

    #[tokio::test]
    async fn test_retap_playing_pauses() {
        let mut player = transport(PlayerState::Ready, true);
        player.expect_pause().times(1).return_const(());
        player.expect_set_media_items().never();
        let session = session_with(player, song("a", true));

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlayOutcome::Paused);
    }

    #[tokio::test]
    async fn test_retap_playing_without_pause_is_noop() {
        let mut player = transport(PlayerState::Buffering, true);
        player.expect_pause().never();
        player.expect_play().never();
        let session = session_with(player, song("a", true));

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new().pause_then_playing(false))
            .await
            .unwrap();
        assert_eq!(outcome, PlayOutcome::AlreadyPlaying);
    }

    #[tokio::test]
    async fn test_retap_play_enabled_resumes() {
        let mut player = transport(PlayerState::Ready, false);
        player.expect_play().times(1).return_const(());
        player.expect_pause().never();
        let session = session_with(player, song("a", true));

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlayOutcome::Resumed);
    }

    #[tokio::test]
    async fn test_retap_ended_restarts() {
        let mut player = transport(PlayerState::Ended, true);
        player
            .expect_seek_to()
            .with(eq(None))
            .times(1)
            .return_const(());
        player.expect_play().never();
        let session = session_with(player, song("a", true));

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlayOutcome::Restarted);
    }

    #[tokio::test]
    async fn test_idle_same_item_builds_queue() {
        // Idle is never "prepared", so even the loaded item gets a fresh queue.
        let mut player = transport(PlayerState::Idle, false);
        player
            .expect_set_media_items()
            .withf(|items, start, position| items.len() == 1 && *start == 0 && position.is_none())
            .times(1)
            .return_const(());
        player.expect_prepare().times(1).return_const(());
        player.expect_play().times(1).return_const(());
        player.expect_pause().never();
        let session = session_with(player, song("a", true));

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PlayOutcome::QueueStarted {
                queue_len: 1,
                start_index: 0
            }
        );
    }

    #[tokio::test]
    async fn test_scoped_queue_filters_unplayable() {
        let mut player = transport(PlayerState::Ready, true);
        player
            .expect_set_media_items()
            .withf(|items, start, position| {
                let ids: Vec<_> = items.iter().map(|i| i.media_id.as_str()).collect();
                ids == ["B", "C"] && *start == 1 && position.is_none()
            })
            .times(1)
            .return_const(());
        player.expect_prepare().times(1).return_const(());
        player.expect_play().times(1).return_const(());

        let mut session = session_with(player, song("other", true));
        session
            .expect_browse()
            .withf(|parent| parent == "album-1")
            .times(1)
            .returning(|_| vec![song("A", false), song("B", true), song("C", true)]);

        let outcome = orchestrator(session)
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
    }

    #[tokio::test]
    async fn test_unscoped_queue_is_singleton() {
        let mut player = transport(PlayerState::Idle, false);
        player
            .expect_set_media_items()
            .withf(|items, start, _| items.len() == 1 && items[0].media_id == "X" && *start == 0)
            .times(1)
            .return_const(());
        player.expect_prepare().times(1).return_const(());
        player.expect_play().times(1).return_const(());

        let mut session = session_with(player, MediaItem::empty());
        session.expect_browse().never();

        orchestrator(session)
            .play_media(&song("X", true), PlayOptions::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_scope_falls_back_to_item() {
        let mut player = transport(PlayerState::Idle, false);
        player
            .expect_set_media_items()
            .withf(|items, start, _| items.len() == 1 && items[0].media_id == "X" && *start == 0)
            .times(1)
            .return_const(());
        player.expect_prepare().return_const(());
        player.expect_play().return_const(());

        let mut session = session_with(player, MediaItem::empty());
        session
            .expect_browse()
            .returning(|_| vec![song("folder", false)]);

        let outcome = orchestrator(session)
            .play_media(&song("X", true), PlayOptions::new().in_scope("folder-parent"))
            .await
            .unwrap();
        assert!(matches!(outcome, PlayOutcome::QueueStarted { queue_len: 1, .. }));
    }

    #[tokio::test]
    async fn test_requested_item_missing_from_scope_starts_at_zero() {
        let mut player = transport(PlayerState::Idle, false);
        player
            .expect_set_media_items()
            .withf(|items, start, _| items.len() == 2 && *start == 0)
            .times(1)
            .return_const(());
        player.expect_prepare().return_const(());
        player.expect_play().return_const(());

        let mut session = session_with(player, MediaItem::empty());
        session
            .expect_browse()
            .returning(|_| vec![song("B", true), song("C", true)]);

        orchestrator(session)
            .play_media(&song("Z", true), PlayOptions::new().in_scope("album"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disconnected_is_noop() {
        let mut session = MockSession::new();
        session.expect_control_surface().returning(|| None);
        session.expect_browse().never();

        let outcome = orchestrator(session)
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome, PlayOutcome::NoControlSurface);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_requests() {
        let session = MockSession::new();
        let orchestrator = orchestrator(session);
        orchestrator.shutdown();

        let error = orchestrator
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap_err();
        assert!(error.is_cancelled());
        assert!(orchestrator.is_shut_down());
    }

    #[tokio::test]
    async fn test_events_published_for_actions() {
        let mut player = transport(PlayerState::Ended, false);
        player.expect_seek_to().return_const(());
        let session = session_with(player, song("a", true));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let orchestrator = orchestrator(session).with_event_bus(bus);

        orchestrator
            .play_media(&song("a", true), PlayOptions::new())
            .await
            .unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            CoreEvent::Playback(PlaybackEvent::Restarted {
                media_id: "a".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_launch_runs_in_background() {
        let mut player = transport(PlayerState::Ready, false);
        player.expect_play().times(1).return_const(());
        let session = session_with(player, song("a", true));
        let orchestrator = Arc::new(orchestrator(session));

        let outcome = orchestrator
            .launch_play_media(song("a", true), PlayOptions::new())
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, PlayOutcome::Resumed);
    }
}

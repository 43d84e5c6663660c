//! What the orchestrator needs from a session connection.

use async_trait::async_trait;
use bridge_traits::{MediaItem, Player};
use core_session::SessionConnection;
use std::sync::Arc;

/// Read/control view of a connected playback session.
#[async_trait]
pub trait PlaybackSession: Send + Sync {
    /// Live control surface, `None` while disconnected.
    fn control_surface(&self) -> Option<Arc<dyn Player>>;

    /// Published now-playing item, the empty sentinel when nothing is loaded.
    fn now_playing(&self) -> MediaItem;

    /// Children of `parent_id`; empty when the session cannot answer.
    async fn browse(&self, parent_id: &str) -> Vec<MediaItem>;
}

#[async_trait]
impl PlaybackSession for SessionConnection {
    fn control_surface(&self) -> Option<Arc<dyn Player>> {
        self.player()
    }

    fn now_playing(&self) -> MediaItem {
        self.now_playing_snapshot()
    }

    async fn browse(&self, parent_id: &str) -> Vec<MediaItem> {
        SessionConnection::browse(self, parent_id).await
    }
}

//! Music source abstraction.
//!
//! A [`MusicSource`] owns an ordered catalog of [`MediaItem`]s plus a
//! [`SourceState`] that moves from `Initializing` to exactly one terminal
//! state per load. Consumers that need the catalog call
//! [`MusicSource::when_ready`] before reading it.

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::MediaItem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a music source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceState {
    /// Constructed, load not yet requested.
    #[default]
    Created,
    /// Load in flight.
    Initializing,
    /// Catalog is the full converted sequence.
    Initialized,
    /// Load failed; catalog is empty.
    Error,
}

impl SourceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SourceState::Initialized | SourceState::Error)
    }
}

/// Field a search query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFocus {
    /// Title, artist, album or genre.
    #[default]
    Any,
    Title,
    Artist,
    Album,
    Genre,
}

#[async_trait]
pub trait MusicSource: Send + Sync {
    /// Fetch and convert the catalog, returning the number of items on success.
    ///
    /// On failure the catalog is empty and the state is [`SourceState::Error`].
    async fn load(&self) -> Result<usize>;

    fn state(&self) -> SourceState;

    /// Receiver that observes every state transition.
    fn watch_state(&self) -> watch::Receiver<SourceState>;

    /// Snapshot of the current catalog.
    fn items(&self) -> Arc<Vec<MediaItem>>;

    /// Suspends until the source reaches a terminal state.
    ///
    /// Returns `true` when the catalog is usable.
    async fn when_ready(&self) -> bool {
        let mut state = self.watch_state();
        loop {
            let current = *state.borrow_and_update();
            if current.is_terminal() {
                return current == SourceState::Initialized;
            }
            if state.changed().await.is_err() {
                // Sender gone: fall back to the last published state.
                return self.state() == SourceState::Initialized;
            }
        }
    }

    fn search(&self, query: &str, focus: SearchFocus) -> Vec<MediaItem> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        self.items()
            .iter()
            .filter(|item| matches_query(item, query, focus))
            .cloned()
            .collect()
    }
}

/// Case-insensitive containment.
///
/// Two absent values are considered equal; an absent value never contains,
/// nor is contained by, a present one.
pub fn contains_case_insensitive(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match (haystack, needle) {
        (Some(haystack), Some(needle)) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        (haystack, needle) => haystack == needle,
    }
}

fn matches_query(item: &MediaItem, query: &str, focus: SearchFocus) -> bool {
    let metadata = &item.metadata;
    let check = |field: &Option<String>| contains_case_insensitive(field.as_deref(), Some(query));

    match focus {
        SearchFocus::Title => check(&metadata.title),
        SearchFocus::Artist => check(&metadata.artist),
        SearchFocus::Album => check(&metadata.album_title),
        SearchFocus::Genre => check(&metadata.genre),
        SearchFocus::Any => {
            check(&metadata.title)
                || check(&metadata.artist)
                || check(&metadata.album_title)
                || check(&metadata.genre)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MediaMetadata;
    use parking_lot::Mutex;

    struct StaticSource {
        items: Arc<Vec<MediaItem>>,
        state: watch::Sender<SourceState>,
        outcome: Mutex<Option<SourceState>>,
    }

    impl StaticSource {
        fn new(items: Vec<MediaItem>, outcome: SourceState) -> Self {
            let (state, _) = watch::channel(SourceState::Initializing);
            Self {
                items: Arc::new(items),
                state,
                outcome: Mutex::new(Some(outcome)),
            }
        }
    }

    #[async_trait]
    impl MusicSource for StaticSource {
        async fn load(&self) -> Result<usize> {
            if let Some(outcome) = self.outcome.lock().take() {
                self.state.send_replace(outcome);
            }
            Ok(self.items.len())
        }

        fn state(&self) -> SourceState {
            *self.state.borrow()
        }

        fn watch_state(&self) -> watch::Receiver<SourceState> {
            self.state.subscribe()
        }

        fn items(&self) -> Arc<Vec<MediaItem>> {
            Arc::clone(&self.items)
        }
    }

    fn track(id: &str, title: &str, artist: &str, genre: Option<&str>) -> MediaItem {
        MediaItem::builder(id).build().with_metadata(MediaMetadata {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album_title: Some("Wake Up".to_string()),
            genre: genre.map(str::to_string),
            is_playable: true,
            ..Default::default()
        })
    }

    fn catalog() -> Vec<MediaItem> {
        vec![
            track("1", "Intro", "The Kyoto Connection", Some("Electronic")),
            track("2", "Geisha", "The Kyoto Connection", Some("Electronic")),
            track("3", "Spring Waltz", "Jazz Trio", None),
        ]
    }

    #[test]
    fn test_contains_case_insensitive() {
        assert!(contains_case_insensitive(Some("Electronic"), Some("tron")));
        assert!(contains_case_insensitive(Some("KYOTO"), Some("kyoto")));
        assert!(!contains_case_insensitive(Some("Jazz"), Some("rock")));
        assert!(contains_case_insensitive(None, None));
        assert!(!contains_case_insensitive(None, Some("x")));
        assert!(!contains_case_insensitive(Some("x"), None));
    }

    #[test]
    fn test_search_any_field() {
        let source = StaticSource::new(catalog(), SourceState::Initialized);
        let ids: Vec<_> = source
            .search("kyoto", SearchFocus::Any)
            .into_iter()
            .map(|item| item.media_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_search_focused_and_empty() {
        let source = StaticSource::new(catalog(), SourceState::Initialized);
        assert_eq!(source.search("waltz", SearchFocus::Title).len(), 1);
        assert!(source.search("waltz", SearchFocus::Genre).is_empty());
        assert!(source.search("   ", SearchFocus::Any).is_empty());
    }

    #[tokio::test]
    async fn test_when_ready_resolves_after_load() {
        let source = Arc::new(StaticSource::new(catalog(), SourceState::Initialized));
        let waiter = {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.when_ready().await })
        };

        source.load().await.unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_when_ready_reports_error() {
        let source = StaticSource::new(Vec::new(), SourceState::Error);
        source.load().await.unwrap();
        assert!(!source.when_ready().await);
        assert_eq!(source.state(), SourceState::Error);
    }
}

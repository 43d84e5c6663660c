//! Canonical media item model shared by the catalog, the session and the host.
//!
//! A [`MediaItem`] is what the playback engine browses, queues and reports as
//! current. "Nothing loaded" is represented by [`MediaItem::empty`] rather than
//! by `Option::None`, so consumers can always read metadata fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// MIME type declared for every catalog stream.
pub const MIME_TYPE_AUDIO_MPEG: &str = "audio/mpeg";

/// Browsable hierarchy kind of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderType {
    /// Leaf item, not browsable.
    #[default]
    None,
    /// Container whose children are items.
    Container,
}

/// Descriptive metadata attached to a [`MediaItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub display_title: Option<String>,
    pub artist: Option<String>,
    pub album_title: Option<String>,
    pub genre: Option<String>,
    /// Artwork URI served to playback and notification surfaces.
    pub artwork_uri: Option<String>,
    pub track_number: Option<u32>,
    pub total_track_count: Option<u32>,
    /// Duration in milliseconds, `None` when unknown.
    pub duration_ms: Option<u64>,
    pub folder_type: FolderType,
    pub is_playable: bool,
    /// Auxiliary string values keyed by well-known names.
    pub extras: HashMap<String, String>,
}

/// Canonical playable (or browsable) entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier, unique within a catalog.
    pub media_id: String,
    /// Absolute streaming URI.
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub metadata: MediaMetadata,
}

impl MediaItem {
    /// Sentinel for "nothing loaded".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` for the [`MediaItem::empty`] sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Start building an item with the given id.
    pub fn builder(media_id: impl Into<String>) -> MediaItemBuilder {
        MediaItemBuilder {
            item: MediaItem {
                media_id: media_id.into(),
                ..MediaItem::default()
            },
        }
    }

    /// Same item with its metadata replaced.
    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_playable(&self) -> bool {
        self.metadata.is_playable
    }

    pub fn is_browsable(&self) -> bool {
        self.metadata.folder_type != FolderType::None
    }
}

/// Builder for [`MediaItem`].
#[derive(Debug, Clone)]
pub struct MediaItemBuilder {
    item: MediaItem,
}

impl MediaItemBuilder {
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.item.uri = Some(uri.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.item.mime_type = Some(mime_type.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.item.metadata.display_title = Some(title.clone());
        self.item.metadata.title = Some(title);
        self
    }

    pub fn metadata(mut self, metadata: MediaMetadata) -> Self {
        self.item.metadata = metadata;
        self
    }

    pub fn playable(mut self, playable: bool) -> Self {
        self.item.metadata.is_playable = playable;
        self
    }

    pub fn folder_type(mut self, folder_type: FolderType) -> Self {
        self.item.metadata.folder_type = folder_type;
        self
    }

    pub fn build(self) -> MediaItem {
        self.item
    }
}

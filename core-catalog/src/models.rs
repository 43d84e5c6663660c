//! Wire models for the remote catalog descriptor.
//!
//! The descriptor is a JSON document, either `{"music": [...]}` or a bare
//! array of entries:
//!
//! ```json
//! {
//!   "music": [
//!     {
//!       "id": "wake_up_01",
//!       "title": "Intro - The Way Of Waking Up (feat. Alan Watts)",
//!       "album": "Wake Up",
//!       "artist": "The Kyoto Connection",
//!       "genre": "Electronic",
//!       "source": "Kyoto_Connection_-_Wake_Up/01_-_Intro.mp3",
//!       "image": "Kyoto_Connection_-_Wake_Up/art.jpg",
//!       "trackNumber": 1,
//!       "totalTrackCount": 13,
//!       "duration": 90,
//!       "site": "http://freemusicarchive.org/music/The_Kyoto_Connection/"
//!     }
//!   ]
//! }
//! ```
//!
//! Entries are transient: they are converted into [`MediaItem`]s by the JSON
//! source and dropped.
//!
//! [`MediaItem`]: bridge_traits::MediaItem

use serde::{Deserialize, Deserializer};

/// Duration value meaning "unknown".
pub const UNKNOWN_DURATION: i64 = -1;

/// Whole catalog document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CatalogDocument {
    Wrapped {
        #[serde(default)]
        music: Vec<RawCatalogEntry>,
    },
    Bare(Vec<RawCatalogEntry>),
}

impl CatalogDocument {
    pub fn into_entries(self) -> Vec<RawCatalogEntry> {
        match self {
            CatalogDocument::Wrapped { music } => music,
            CatalogDocument::Bare(music) => music,
        }
    }
}

/// One track as declared by the descriptor.
///
/// `source` and `image` may be relative to the descriptor's own location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCatalogEntry {
    pub id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub source: String,
    pub image: String,
    #[serde(deserialize_with = "lenient_integer")]
    pub track_number: i64,
    #[serde(deserialize_with = "lenient_integer")]
    pub total_track_count: i64,
    /// Seconds; [`UNKNOWN_DURATION`] when absent.
    #[serde(deserialize_with = "lenient_integer")]
    pub duration: i64,
    pub site: String,
}

impl Default for RawCatalogEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            album: String::new(),
            artist: String::new(),
            genre: String::new(),
            source: String::new(),
            image: String::new(),
            track_number: 0,
            total_track_count: 0,
            duration: UNKNOWN_DURATION,
            site: String::new(),
        }
    }
}

impl RawCatalogEntry {
    /// Duration in milliseconds, `None` when the descriptor did not know it.
    pub fn duration_ms(&self) -> Option<u64> {
        u64::try_from(self.duration)
            .ok()
            .map(|seconds| seconds.saturating_mul(1000))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Integer(i64),
    Float(f64),
}

// Descriptors produced by some tools serialize counters as floats.
fn lenient_integer<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireNumber::deserialize(deserializer)? {
        WireNumber::Integer(value) => value,
        WireNumber::Float(value) => value.trunc() as i64,
    })
}

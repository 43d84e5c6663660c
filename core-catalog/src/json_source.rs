//! # JSON Catalog Source
//!
//! Loads a remote JSON descriptor into canonical [`MediaItem`]s.
//!
//! ## Conversion
//!
//! - Relative `source`/`image` fields are resolved against the descriptor's
//!   own URI with its last path segment removed. A field is treated as
//!   absolute when it starts with the descriptor's scheme.
//! - The resolved image URI is mapped through the configured
//!   [`ArtworkResolver`]; the unmapped URI is kept in the item's extras under
//!   [`ORIGINAL_ARTWORK_URI_KEY`].
//! - Duration is converted from seconds to milliseconds.
//! - Every item is playable, not browsable, and declared as `audio/mpeg`.
//!
//! ## Atomicity
//!
//! Fetch and conversion run on a spawned worker task. The catalog is replaced
//! in one step when the worker finishes: the full converted sequence on
//! success, an empty one on failure.

use crate::error::{CatalogError, Result};
use crate::models::{CatalogDocument, RawCatalogEntry};
use crate::source::{MusicSource, SourceState};
use async_trait::async_trait;
use bridge_traits::{
    ArtworkResolver, FolderType, HttpClient, HttpRequest, MediaItem, MediaMetadata,
    MIME_TYPE_AUDIO_MPEG, ORIGINAL_ARTWORK_URI_KEY,
};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_uri;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// [`MusicSource`] backed by a remote JSON descriptor.
pub struct JsonSource {
    source: Url,
    http_client: Arc<dyn HttpClient>,
    artwork_resolver: Arc<dyn ArtworkResolver>,
    event_bus: Option<EventBus>,
    catalog: RwLock<Arc<Vec<MediaItem>>>,
    state: watch::Sender<SourceState>,
}

impl JsonSource {
    /// Creates a source in the `Initializing` state. Nothing is fetched until
    /// [`MusicSource::load`] is called.
    pub fn new(
        source: Url,
        http_client: Arc<dyn HttpClient>,
        artwork_resolver: Arc<dyn ArtworkResolver>,
    ) -> Self {
        let (state, _) = watch::channel(SourceState::Initializing);
        Self {
            source,
            http_client,
            artwork_resolver,
            event_bus: None,
            catalog: RwLock::new(Arc::new(Vec::new())),
            state,
        }
    }

    /// Announce load transitions on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn source_uri(&self) -> &Url {
        &self.source
    }

    fn publish(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(CoreEvent::Catalog(event));
        }
    }
}

#[async_trait]
impl MusicSource for JsonSource {
    #[instrument(skip(self), fields(uri = %redact_uri(self.source.as_str())))]
    async fn load(&self) -> Result<usize> {
        let display_uri = redact_uri(self.source.as_str());
        self.state.send_replace(SourceState::Initializing);
        self.publish(CatalogEvent::Loading {
            uri: display_uri.clone(),
        });

        let worker = tokio::spawn(fetch_catalog(
            self.source.clone(),
            Arc::clone(&self.http_client),
            Arc::clone(&self.artwork_resolver),
        ));

        let result = match worker.await {
            Ok(result) => result,
            Err(join_error) => Err(CatalogError::Worker(join_error.to_string())),
        };

        match result {
            Ok(items) => {
                let count = items.len();
                *self.catalog.write() = Arc::new(items);
                self.state.send_replace(SourceState::Initialized);
                info!(item_count = count, "Catalog loaded");
                self.publish(CatalogEvent::Loaded {
                    uri: display_uri,
                    item_count: count,
                });
                Ok(count)
            }
            Err(error) => {
                *self.catalog.write() = Arc::new(Vec::new());
                self.state.send_replace(SourceState::Error);
                warn!(error = %error, "Catalog load failed");
                self.publish(CatalogEvent::Failed {
                    uri: display_uri,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn state(&self) -> SourceState {
        *self.state.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<SourceState> {
        self.state.subscribe()
    }

    fn items(&self) -> Arc<Vec<MediaItem>> {
        self.catalog.read().clone()
    }
}

async fn fetch_catalog(
    source: Url,
    http_client: Arc<dyn HttpClient>,
    artwork_resolver: Arc<dyn ArtworkResolver>,
) -> Result<Vec<MediaItem>> {
    let request = HttpRequest::get(source.as_str()).accept_json();
    let response = http_client.execute(request).await?;

    if !response.is_success() {
        return Err(CatalogError::HttpStatus {
            uri: redact_uri(source.as_str()),
            status: response.status,
        });
    }

    let entries = serde_json::from_slice::<CatalogDocument>(&response.body)?.into_entries();
    debug!(
        entry_count = entries.len(),
        content_type = response.header("content-type").unwrap_or("unknown"),
        "Parsed catalog descriptor"
    );

    let base = base_uri(&source);
    Ok(entries
        .into_iter()
        .map(|entry| to_media_item(entry, source.scheme(), &base, artwork_resolver.as_ref()))
        .collect())
}

/// Descriptor URI without its last path segment (and without query or fragment).
///
/// ```
/// use core_catalog::json_source::base_uri;
/// use url::Url;
///
/// let uri = Url::parse("http://host/path/catalog.json").unwrap();
/// assert_eq!(base_uri(&uri), "http://host/path/");
/// ```
pub fn base_uri(source: &Url) -> String {
    let mut source = source.clone();
    source.set_query(None);
    source.set_fragment(None);

    let full = source.as_str();
    let last_segment = source
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    full.strip_suffix(last_segment).unwrap_or(full).to_string()
}

/// Prefix `field` with `base` unless it already starts with `scheme`.
pub fn resolve(field: &str, scheme: &str, base: &str) -> String {
    if field.starts_with(scheme) {
        field.to_string()
    } else {
        format!("{}{}", base, field)
    }
}

fn to_media_item(
    entry: RawCatalogEntry,
    scheme: &str,
    base: &str,
    artwork_resolver: &dyn ArtworkResolver,
) -> MediaItem {
    let source = resolve(&entry.source, scheme, base);
    let image = resolve(&entry.image, scheme, base);
    let artwork_uri = artwork_resolver.map_uri(&image);
    let duration_ms = entry.duration_ms();

    let mut extras = HashMap::new();
    extras.insert(ORIGINAL_ARTWORK_URI_KEY.to_string(), image);

    let metadata = MediaMetadata {
        title: Some(entry.title.clone()),
        display_title: Some(entry.title),
        artist: Some(entry.artist),
        album_title: Some(entry.album),
        genre: Some(entry.genre),
        artwork_uri: Some(artwork_uri),
        track_number: u32::try_from(entry.track_number).ok(),
        total_track_count: u32::try_from(entry.total_track_count).ok(),
        duration_ms,
        folder_type: FolderType::None,
        is_playable: true,
        extras,
    };

    MediaItem::builder(entry.id)
        .uri(source)
        .mime_type(MIME_TYPE_AUDIO_MPEG)
        .metadata(metadata)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{BridgeError, HttpResponse, PassthroughArtworkResolver};
    use mockall::mock;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(
                &self,
                request: HttpRequest,
            ) -> std::result::Result<HttpResponse, BridgeError>;
        }
    }

    const CATALOG: &str = r#"{
        "music": [
            {
                "id": "wake_up_01",
                "title": "Intro",
                "album": "Wake Up",
                "artist": "The Kyoto Connection",
                "genre": "Electronic",
                "source": "wake_up/01.mp3",
                "image": "wake_up/art.jpg",
                "trackNumber": 1,
                "totalTrackCount": 2,
                "duration": 90
            },
            {
                "id": "wake_up_02",
                "title": "Geisha",
                "album": "Wake Up",
                "artist": "The Kyoto Connection",
                "genre": "Electronic",
                "source": "https://cdn.example.com/02.mp3",
                "image": "https://cdn.example.com/art.jpg",
                "trackNumber": 2.0,
                "totalTrackCount": 2,
                "duration": 267
            }
        ]
    }"#;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: bytes::Bytes::from(body.to_string()),
        }
    }

    fn source_with(http: MockHttp) -> JsonSource {
        JsonSource::new(
            Url::parse("https://storage.example.com/music/catalog.json").unwrap(),
            Arc::new(http),
            Arc::new(PassthroughArtworkResolver),
        )
    }

    #[test]
    fn test_base_uri_and_resolve() {
        let uri = Url::parse("http://host/path/catalog.json").unwrap();
        let base = base_uri(&uri);
        assert_eq!(base, "http://host/path/");
        assert_eq!(
            resolve("songs/a.mp3", uri.scheme(), &base),
            "http://host/path/songs/a.mp3"
        );
        assert_eq!(resolve("http://cdn/a.mp3", uri.scheme(), &base), "http://cdn/a.mp3");
    }

    #[test]
    fn test_base_uri_ignores_query() {
        let uri = Url::parse("https://host/a/catalog.json?sig=1#frag").unwrap();
        assert_eq!(base_uri(&uri), "https://host/a/");

        let directory = Url::parse("https://host/a/").unwrap();
        assert_eq!(base_uri(&directory), "https://host/a/");
    }

    #[tokio::test]
    async fn test_load_converts_entries() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| request.url == "https://storage.example.com/music/catalog.json")
            .times(1)
            .returning(|_| Ok(response(200, CATALOG)));

        let source = source_with(http);
        assert_eq!(source.state(), SourceState::Initializing);

        let count = source.load().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(source.state(), SourceState::Initialized);

        let items = source.items();
        let first = &items[0];
        assert_eq!(first.media_id, "wake_up_01");
        assert_eq!(
            first.uri.as_deref(),
            Some("https://storage.example.com/music/wake_up/01.mp3")
        );
        assert_eq!(first.mime_type.as_deref(), Some(MIME_TYPE_AUDIO_MPEG));
        assert_eq!(first.metadata.duration_ms, Some(90_000));
        assert_eq!(first.metadata.display_title.as_deref(), Some("Intro"));
        assert!(first.is_playable());
        assert!(!first.is_browsable());
        assert_eq!(
            first.metadata.extras.get(ORIGINAL_ARTWORK_URI_KEY).map(String::as_str),
            Some("https://storage.example.com/music/wake_up/art.jpg")
        );

        let second = &items[1];
        assert_eq!(second.uri.as_deref(), Some("https://cdn.example.com/02.mp3"));
        assert_eq!(second.metadata.track_number, Some(2));
    }

    #[tokio::test]
    async fn test_load_maps_artwork_through_resolver() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, CATALOG)));

        let resolver = Arc::new(crate::artwork::ContentArtworkResolver::new("player.art"));
        let source = JsonSource::new(
            Url::parse("https://storage.example.com/music/catalog.json").unwrap(),
            Arc::new(http),
            resolver.clone(),
        );
        source.load().await.unwrap();

        let items = source.items();
        let artwork = items[0].metadata.artwork_uri.clone().unwrap();
        assert_eq!(
            artwork,
            "content://player.art/storage.example.com:music:wake_up:art.jpg"
        );
        assert_eq!(
            resolver.original_uri(&artwork).as_deref(),
            Some("https://storage.example.com/music/wake_up/art.jpg")
        );
    }

    #[tokio::test]
    async fn test_http_error_empties_catalog() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(response(404, "not found")));

        let source = source_with(http);
        let result = source.load().await;

        assert!(matches!(result, Err(CatalogError::HttpStatus { status: 404, .. })));
        assert_eq!(source.state(), SourceState::Error);
        assert!(source.items().is_empty());
        assert!(!source.when_ready().await);
    }

    #[tokio::test]
    async fn test_malformed_descriptor_is_atomic_failure() {
        // Second entry is malformed, so nothing from the first may leak through.
        let body = r#"{"music":[{"id":"ok"},{"id":"bad","trackNumber":"x"}]}"#;
        let mut http = MockHttp::new();
        http.expect_execute().returning(move |_| Ok(response(200, body)));

        let source = source_with(http);
        assert!(source.load().await.is_err());
        assert!(source.items().is_empty());
        assert_eq!(source.state(), SourceState::Error);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_as_bridge_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("offline".to_string())));

        let source = source_with(http);
        let result = source.load().await;
        assert!(matches!(result, Err(CatalogError::Bridge(_))));
        assert_eq!(source.state(), SourceState::Error);
    }

    #[tokio::test]
    async fn test_load_publishes_catalog_events() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(response(200, CATALOG)));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let source = source_with(http).with_event_bus(bus);
        source.load().await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::Loading { .. })
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::Loaded {
                uri: "https://storage.example.com/music/catalog.json".to_string(),
                item_count: 2,
            })
        );
    }
}

//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, artwork
//! resolution, the playback engine connector) into the shared Rust core.
//! Desktop apps typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) to get a reqwest-backed HTTP client for free.
//!
//! A running [`CoreService`] owns:
//! - the catalog source loading the remote descriptor,
//! - the process-wide session connection to the playback engine,
//! - the playback orchestrator applying play requests,
//! - the root media-items view hosts render as the library screen.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    ArtworkResolver, HttpClient, MediaItem, SessionConnector, MEDIA_ROOT_ID,
};
use core_catalog::{BrowseTree, JsonSource, MusicSource, SearchFocus};
use core_playback::{PlayOptions, PlayOutcome, PlaybackOrchestrator};
use core_runtime::config::CoreConfig;
use core_runtime::envelope::Resource;
use core_runtime::events::{EventBus, EventStream};
use core_session::{SessionConnection, SessionOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Message published on the media-items view when the engine never connects.
pub const MEDIA_ITEMS_UNAVAILABLE: &str = "Playback engine is not connected";

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub artwork_resolver: Arc<dyn ArtworkResolver>,
    pub session_connector: Arc<dyn SessionConnector>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        artwork_resolver: Arc<dyn ArtworkResolver>,
        session_connector: Arc<dyn SessionConnector>,
    ) -> Self {
        Self {
            http_client,
            artwork_resolver,
            session_connector,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            Arc::clone(&config.http_client),
            Arc::clone(&config.artwork_resolver),
            Arc::clone(&config.session_connector),
        )
    }

    /// Desktop bundle: reqwest HTTP client and pass-through artwork.
    #[cfg(feature = "desktop-shims")]
    pub fn desktop(session_connector: Arc<dyn SessionConnector>) -> Result<Self> {
        let http_client = bridge_desktop::ReqwestHttpClient::new().map_err(|err| {
            CoreError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: err.to_string(),
            }
        })?;

        Ok(Self::new(
            Arc::new(http_client),
            Arc::new(bridge_traits::PassthroughArtworkResolver),
            session_connector,
        ))
    }
}

struct ServiceInner {
    deps: CoreDependencies,
    event_bus: EventBus,
    catalog: Arc<JsonSource>,
    session: Arc<SessionConnection>,
    orchestrator: Arc<PlaybackOrchestrator>,
    media_items: watch::Sender<Resource<Vec<MediaItem>>>,
    tasks: CancellationToken,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Starts the core: loads the catalog, connects to the playback engine
    /// and fills the root media-items view in the background.
    ///
    /// Reuses the process-wide session connection if one is live.
    #[instrument(skip_all, fields(catalog = %core_runtime::logging::redact_uri(config.catalog_uri.as_str())))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let deps = CoreDependencies::from_config(&config);
        let event_bus = EventBus::new(config.event_bus_capacity);

        let catalog = Arc::new(
            JsonSource::new(
                config.catalog_uri.clone(),
                Arc::clone(&deps.http_client),
                Arc::clone(&deps.artwork_resolver),
            )
            .with_event_bus(event_bus.clone()),
        );

        let session = core_session::get_or_create(
            config.session_token.clone(),
            Arc::clone(&deps.session_connector),
            SessionOptions::from_config(&config, event_bus.clone()),
        );

        let orchestrator = Arc::new(
            PlaybackOrchestrator::new(session.clone()).with_event_bus(event_bus.clone()),
        );

        let service = Self {
            inner: Arc::new(ServiceInner {
                deps,
                event_bus,
                catalog,
                session,
                orchestrator,
                media_items: watch::Sender::new(Resource::loading(None)),
                tasks: CancellationToken::new(),
            }),
        };

        service.spawn_catalog_load();
        service.spawn_media_items_refresh();

        info!(service = %config.session_token, "Core service started");
        Ok(service)
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> &CoreDependencies {
        &self.inner.deps
    }

    pub fn session(&self) -> Arc<SessionConnection> {
        Arc::clone(&self.inner.session)
    }

    pub fn catalog_source(&self) -> Arc<JsonSource> {
        Arc::clone(&self.inner.catalog)
    }

    /// Browse tree over the catalog as currently loaded.
    pub fn browse_tree(&self) -> BrowseTree {
        BrowseTree::from_source(self.inner.catalog.as_ref())
    }

    pub fn search(&self, query: &str, focus: SearchFocus) -> Vec<MediaItem> {
        self.inner.catalog.search(query, focus)
    }

    /// Lifecycle events from the catalog, the session and the orchestrator.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    /// Root media items: `Loading` until the engine answers, then `Success`
    /// with the root's children or `Error` if it never connects.
    pub fn media_items(&self) -> watch::Receiver<Resource<Vec<MediaItem>>> {
        self.inner.media_items.subscribe()
    }

    /// Re-reads the root's children from the engine.
    pub async fn refresh_media_items(&self) {
        let inner = &self.inner;
        inner.media_items.send_replace(Resource::loading(None));

        let connected = tokio::select! {
            _ = inner.tasks.cancelled() => return,
            connected = inner.session.wait_until_connected() => connected,
        };
        if !connected {
            warn!("Media items unavailable, engine not connected");
            inner
                .media_items
                .send_replace(Resource::error(MEDIA_ITEMS_UNAVAILABLE, None));
            return;
        }

        let items = tokio::select! {
            _ = inner.tasks.cancelled() => return,
            items = inner.session.browse(MEDIA_ROOT_ID) => items,
        };
        debug!(count = items.len(), "Root media items refreshed");
        inner.media_items.send_replace(Resource::success(items));
    }

    /// Reloads the remote catalog descriptor.
    pub async fn reload_catalog(&self) -> Result<usize> {
        Ok(self.inner.catalog.load().await?)
    }

    pub async fn play_media(&self, item: &MediaItem, options: PlayOptions) -> Result<PlayOutcome> {
        Ok(self.inner.orchestrator.play_media(item, options).await?)
    }

    /// Fire-and-forget variant of [`play_media`](Self::play_media).
    pub fn launch_play_media(
        &self,
        item: MediaItem,
        options: PlayOptions,
    ) -> Result<JoinHandle<core_playback::Result<PlayOutcome>>> {
        Ok(self.inner.orchestrator.launch_play_media(item, options)?)
    }

    /// Stops background work and releases the engine connection.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.tasks.cancel();
        inner.orchestrator.shutdown();
        inner.session.release();
        info!("Core service shut down");
    }

    /// Not tied to shutdown: the load always settles the source in a
    /// terminal state.
    fn spawn_catalog_load(&self) {
        let catalog = Arc::clone(&self.inner.catalog);
        tokio::spawn(async move {
            match catalog.load().await {
                Ok(count) => debug!(count, "Catalog ready"),
                Err(err) => warn!(error = %err, "Catalog load failed"),
            }
        });
    }

    fn spawn_media_items_refresh(&self) {
        let service = self.clone();
        tokio::spawn(async move { service.refresh_media_items().await });
    }
}

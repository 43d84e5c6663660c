//! # Session Connection
//!
//! Supervises the single live connection to the playback engine and turns
//! engine callbacks into observable state.
//!
//! ## Lifecycle
//!
//! ```text
//!  connect() ──spawn──> handshake ──ok──> listener task ──Disconnected──> release()
//!                           │                   │
//!                           └──err──> Error     ├── library root ──> Connected
//!                                               └── recompute + publish per batch
//! ```
//!
//! Every published value lives in a `tokio::sync::watch` channel, so late
//! subscribers always see the latest snapshot. Engine callbacks arrive as
//! [`SessionEvent`] batches on a bounded channel consumed by one listener
//! task. For every batch the listener re-reads the engine's player instead
//! of diffing, so a reordered or coalesced batch cannot leave stale state.
//! Item lookups that enrich `now_playing` run as child tasks; the listener
//! never waits on them.
//!
//! ## Release
//!
//! [`SessionConnection::release`] cancels the connection's scope (stopping
//! the listener and resolving in-flight `browse`/`send_command` calls to
//! their empty results), resets every published value to its default and
//! releases the engine handle. Publishes from background work check the
//! scope under the same lock `release` takes, so no value can land after the
//! reset.

use crate::registry;
use crate::state::{
    connection_resource, is_network_failure, ConnectionSignal, ConnectionStatus, NetworkSignal,
    NetworkStatus, TransportState, NETWORK_ERROR_MESSAGE,
};
use bridge_traits::{
    Bundle, MediaBrowser, MediaItem, PlaybackException, Player, PlayerEvent, PlayerEvents,
    PlayerState, SessionCommand, SessionConnector, SessionEvent, SessionToken,
};
use core_runtime::config::{CoreConfig, DEFAULT_BROWSE_PAGE_SIZE, DEFAULT_EVENT_BUFFER_SIZE};
use core_runtime::envelope::{Event, Resource};
use core_runtime::events::{ConnectionEvent, CoreEvent, EventBus};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Batches that change the transport snapshot.
const TRANSPORT_EVENTS: [PlayerEvent; 3] = [
    PlayerEvent::PlayWhenReadyChanged,
    PlayerEvent::PlaybackStateChanged,
    PlayerEvent::MediaItemTransition,
];

/// Batches that may change what is loaded.
const ITEM_EVENTS: [PlayerEvent; 3] = [
    PlayerEvent::MediaMetadataChanged,
    PlayerEvent::MediaItemTransition,
    PlayerEvent::PlayWhenReadyChanged,
];

/// Tunables for a [`SessionConnection`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Children requested per browse call.
    pub page_size: u32,
    /// Depth of the engine event queue.
    pub event_buffer_size: usize,
    pub event_bus: Option<EventBus>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_BROWSE_PAGE_SIZE,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            event_bus: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &CoreConfig, event_bus: EventBus) -> Self {
        Self {
            page_size: config.browse_page_size,
            event_buffer_size: config.event_buffer_size,
            event_bus: Some(event_bus),
        }
    }
}

/// Connection to the playback engine plus the state derived from it.
pub struct SessionConnection {
    token: SessionToken,
    page_size: u32,
    event_bus: Option<EventBus>,
    browser: RwLock<Option<Arc<dyn MediaBrowser>>>,
    connection_status: watch::Sender<ConnectionSignal>,
    network_status: watch::Sender<NetworkSignal>,
    transport_state: watch::Sender<TransportState>,
    current_item: watch::Sender<MediaItem>,
    root_item: watch::Sender<MediaItem>,
    now_playing: watch::Sender<MediaItem>,
    lookup: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
    cancel: CancellationToken,
}

impl SessionConnection {
    /// Creates a connection and starts the handshake in the background.
    ///
    /// Handshake failures are published on [`connection_status`](Self::connection_status);
    /// this call never fails. Without a Tokio runtime the connection is
    /// returned already in the `Error` state.
    pub fn connect(
        token: SessionToken,
        connector: Arc<dyn SessionConnector>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let connection = Arc::new(Self::new(token, &options));

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(
                    Arc::clone(&connection).establish(connector, options.event_buffer_size),
                );
            }
            Err(_) => {
                let message = crate::SessionError::NoRuntime.to_string();
                error!(service = %connection.token, "{}", message);
                connection.publish_status(ConnectionStatus::Error, Some(message));
            }
        }

        connection
    }

    fn new(token: SessionToken, options: &SessionOptions) -> Self {
        Self {
            token,
            page_size: options.page_size,
            event_bus: options.event_bus.clone(),
            browser: RwLock::new(None),
            connection_status: watch::Sender::new(None),
            network_status: watch::Sender::new(None),
            transport_state: watch::Sender::new(TransportState::default()),
            current_item: watch::Sender::new(MediaItem::empty()),
            root_item: watch::Sender::new(MediaItem::empty()),
            now_playing: watch::Sender::new(MediaItem::empty()),
            lookup: Mutex::new(None),
            released: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn is_connected(&self) -> bool {
        self.browser().is_some_and(|browser| browser.is_connected())
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Live control surface, `None` unless connected.
    pub fn player(&self) -> Option<Arc<dyn Player>> {
        self.browser()
            .filter(|browser| browser.is_connected())
            .map(|browser| browser.player())
    }

    pub fn connection_status(&self) -> watch::Receiver<ConnectionSignal> {
        self.connection_status.subscribe()
    }

    pub fn network_status(&self) -> watch::Receiver<NetworkSignal> {
        self.network_status.subscribe()
    }

    pub fn transport_state(&self) -> watch::Receiver<TransportState> {
        self.transport_state.subscribe()
    }

    /// Item the transport has loaded, as the transport reports it.
    pub fn current_item(&self) -> watch::Receiver<MediaItem> {
        self.current_item.subscribe()
    }

    pub fn root_item(&self) -> watch::Receiver<MediaItem> {
        self.root_item.subscribe()
    }

    /// Current item with the engine's full metadata; the empty sentinel when
    /// nothing is loaded.
    pub fn now_playing(&self) -> watch::Receiver<MediaItem> {
        self.now_playing.subscribe()
    }

    pub fn now_playing_snapshot(&self) -> MediaItem {
        self.now_playing.borrow().clone()
    }

    pub fn transport_snapshot(&self) -> TransportState {
        *self.transport_state.borrow()
    }

    /// Waits for the handshake outcome. `true` once connected, `false` if the
    /// handshake failed or the connection was released.
    pub async fn wait_until_connected(&self) -> bool {
        let mut status = self.connection_status.subscribe();
        loop {
            let current = status
                .borrow_and_update()
                .as_ref()
                .and_then(|event| event.peek_content().data);

            match current {
                Some(ConnectionStatus::Connected) => return true,
                Some(ConnectionStatus::Error) | Some(ConnectionStatus::Disconnected) => {
                    return false
                }
                Some(ConnectionStatus::Connecting) | None => {}
            }

            if status.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Children of `parent_id`, at most one page.
    ///
    /// Empty when not connected, on engine errors, or once released.
    #[instrument(skip(self), fields(service = %self.token))]
    pub async fn browse(&self, parent_id: &str) -> Vec<MediaItem> {
        let Some(browser) = self.browser() else {
            debug!("Browse requested before the engine connected");
            return Vec::new();
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Vec::new(),
            children = browser.children(parent_id, 0, self.page_size) => {
                children.unwrap_or_else(|error| {
                    warn!(error = %error, "Browse request failed");
                    Vec::new()
                })
            }
        }
    }

    /// Sends a custom command, discarding its result.
    pub async fn send_command(&self, name: &str, parameters: Option<Bundle>) -> bool {
        self.send_command_with_result(name, parameters, |_, _| {})
            .await
    }

    /// Sends a custom command and hands its result code and extras to
    /// `on_result`.
    ///
    /// Returns `false` without calling `on_result` when not connected.
    #[instrument(skip(self, parameters, on_result), fields(service = %self.token))]
    pub async fn send_command_with_result<F>(
        &self,
        name: &str,
        parameters: Option<Bundle>,
        on_result: F,
    ) -> bool
    where
        F: FnOnce(i32, Option<Bundle>) + Send,
    {
        let Some(browser) = self.browser().filter(|browser| browser.is_connected()) else {
            return false;
        };

        let args = parameters.unwrap_or_default();
        let command = SessionCommand::new(name, args.clone());

        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!(command = name, "Released while waiting for a command result");
            }
            result = browser.send_custom_command(command, args) => match result {
                Ok(result) => on_result(result.result_code, result.extras),
                Err(error) => warn!(command = name, error = %error, "Custom command failed"),
            }
        }

        true
    }

    /// Tears the connection down and resets every published value.
    ///
    /// Idempotent. Also drops the process-wide registration if it points at
    /// this connection.
    pub fn release(&self) {
        let first_release = !self.released.swap(true, Ordering::AcqRel);
        self.cancel.cancel();

        let browser = self.browser.write().take();

        reset(&self.root_item);
        reset(&self.now_playing);
        reset(&self.current_item);
        reset(&self.transport_state);
        self.network_status.send_if_modified(|signal| signal.take().is_some());

        if let Some(browser) = browser {
            browser.release();
        }

        if first_release {
            self.publish_status(ConnectionStatus::Disconnected, None);
            info!(service = %self.token, "Released playback engine connection");
            self.emit(ConnectionEvent::Released {
                service: self.token.service.clone(),
            });
        }

        registry::forget(self);
    }

    fn browser(&self) -> Option<Arc<dyn MediaBrowser>> {
        self.browser.read().clone()
    }

    /// Runs `publish` unless the connection has been released.
    ///
    /// `publish` must not touch `self.browser`.
    fn if_live(&self, publish: impl FnOnce()) {
        let _guard = self.browser.read();
        if !self.cancel.is_cancelled() {
            publish();
        }
    }

    fn publish_status(&self, status: ConnectionStatus, message: Option<String>) {
        self.connection_status
            .send_replace(Some(Event::new(connection_resource(status, message))));
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(CoreEvent::Connection(event));
        }
    }

    #[instrument(skip_all, fields(service = %self.token))]
    async fn establish(self: Arc<Self>, connector: Arc<dyn SessionConnector>, buffer: usize) {
        self.if_live(|| self.publish_status(ConnectionStatus::Connecting, None));
        self.emit(ConnectionEvent::Connecting {
            service: self.token.service.clone(),
        });

        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let connected = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Released before the handshake completed");
                return;
            }
            connected = connector.connect(&self.token, sender) => connected,
        };

        let browser = match connected {
            Ok(browser) => browser,
            Err(error) => {
                warn!(error = %error, "Failed to connect to playback engine");
                let message = error.to_string();
                self.if_live(|| self.publish_status(ConnectionStatus::Error, Some(message.clone())));
                self.emit(ConnectionEvent::ConnectionFailed {
                    service: self.token.service.clone(),
                    message,
                });
                return;
            }
        };

        {
            let mut slot = self.browser.write();
            if self.cancel.is_cancelled() {
                drop(slot);
                browser.release();
                return;
            }
            *slot = Some(Arc::clone(&browser));
        }

        // From here on the listener is the only writer of the derived state.
        tokio::spawn(run_listener(
            Arc::downgrade(&self),
            browser,
            receiver,
            self.cancel.clone(),
        ));
    }

    /// Library root resolved: publish it and flip the status to `Connected`.
    fn on_root_resolved(&self, root: bridge_traits::error::Result<MediaItem>) {
        let root = match root {
            Ok(root) => Some(root),
            Err(error) => {
                warn!(error = %error, "Failed to resolve library root");
                None
            }
        };
        if self.cancel.is_cancelled() {
            return;
        }

        let root_id = root.as_ref().map(|root| root.media_id.clone()).unwrap_or_default();
        info!(service = %self.token, root_id = %root_id, "Connected to playback engine");
        self.emit(ConnectionEvent::Connected {
            service: self.token.service.clone(),
            root_id,
        });

        self.if_live(|| {
            if let Some(root) = root {
                self.root_item.send_replace(root);
            }
            self.publish_status(ConnectionStatus::Connected, None);
        });
    }

    /// First snapshot of the transport, taken before any engine batch.
    fn sync_from_player(self: &Arc<Self>, browser: &Arc<dyn MediaBrowser>) {
        let player = browser.player();
        self.publish_transport(player.as_ref(), false);
        self.refresh_now_playing(browser, player.as_ref());
    }

    fn on_player_events(self: &Arc<Self>, events: &PlayerEvents) {
        let Some(browser) = self.browser() else {
            return;
        };
        let player = browser.player();

        if events.contains_any(&TRANSPORT_EVENTS) {
            self.publish_transport(player.as_ref(), true);
        }
        if events.contains_any(&ITEM_EVENTS) {
            self.refresh_now_playing(&browser, player.as_ref());
        }
    }

    fn publish_transport(&self, player: &dyn Player, signal_network: bool) {
        let transport = TransportState::from_player(player);
        debug!(state = ?transport.state, play_when_ready = transport.play_when_ready, "Transport changed");
        self.if_live(|| {
            self.transport_state.send_replace(transport);
            if signal_network && transport.state != PlayerState::Idle {
                self.network_status.send_replace(Some(Event::new(Resource::success(
                    NetworkStatus::Available,
                ))));
            }
        });
    }

    /// Publishes the transport's item at once, then enriches `now_playing`
    /// from a background lookup. A newer lookup supersedes an older one.
    fn refresh_now_playing(self: &Arc<Self>, browser: &Arc<dyn MediaBrowser>, player: &dyn Player) {
        let item = player.current_media_item().unwrap_or_else(MediaItem::empty);
        self.if_live(|| {
            self.current_item.send_replace(item.clone());
            // Keep an already enriched record for the same item.
            self.now_playing.send_if_modified(|now_playing| {
                if now_playing.media_id == item.media_id {
                    false
                } else {
                    *now_playing = item.clone();
                    true
                }
            });
        });

        let lookup = if item.is_empty() {
            None
        } else {
            Some(tokio::spawn(lookup_item(
                Arc::downgrade(self),
                Arc::clone(browser),
                item,
                self.cancel.clone(),
            )))
        };

        if let Some(previous) = std::mem::replace(&mut *self.lookup.lock(), lookup) {
            previous.abort();
        }
    }

    fn apply_lookup(&self, item: MediaItem, lookup: bridge_traits::error::Result<Option<MediaItem>>) {
        match lookup {
            Ok(Some(full)) => {
                let merged = item.with_metadata(full.metadata);
                self.if_live(|| {
                    // The transport may have moved on while the lookup ran.
                    if self.current_item.borrow().media_id == merged.media_id {
                        self.now_playing.send_replace(merged);
                    }
                });
            }
            Ok(None) => debug!(media_id = %item.media_id, "No enriched record for current item"),
            Err(error) => {
                warn!(media_id = %item.media_id, error = %error, "Current item lookup failed")
            }
        }
    }

    fn on_player_error(&self, error: Option<&PlaybackException>) {
        match error {
            Some(error) if is_network_failure(error.code) => {
                warn!(code = ?error.code, message = %error.message, "Playback network error");
                self.if_live(|| {
                    self.network_status.send_replace(Some(Event::new(Resource::error(
                        NETWORK_ERROR_MESSAGE,
                        Some(NetworkStatus::Unavailable),
                    ))));
                });
                self.emit(ConnectionEvent::NetworkError {
                    message: NETWORK_ERROR_MESSAGE.to_string(),
                });
            }
            Some(error) => {
                warn!(code = ?error.code, message = %error.message, "Unclassified playback error")
            }
            None => debug!("Playback error cleared"),
        }
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(browser) = self.browser.get_mut().take() {
            browser.release();
        }
    }
}

impl std::fmt::Debug for SessionConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConnection")
            .field("token", &self.token)
            .field("page_size", &self.page_size)
            .field("released", &self.is_released())
            .finish()
    }
}

fn reset<T: Default + PartialEq>(sender: &watch::Sender<T>) {
    sender.send_if_modified(|value| {
        if *value == T::default() {
            false
        } else {
            *value = T::default();
            true
        }
    });
}

/// Engine-side progress the listener reacts to.
enum Step {
    Root(bridge_traits::error::Result<MediaItem>),
    Event(Option<SessionEvent>),
    Stop,
}

async fn run_listener(
    connection: Weak<SessionConnection>,
    browser: Arc<dyn MediaBrowser>,
    mut events: mpsc::Receiver<SessionEvent>,
    cancel: CancellationToken,
) {
    match connection.upgrade() {
        Some(connection) => connection.sync_from_player(&browser),
        None => return,
    }

    // The root is resolved alongside the event stream so a slow engine
    // cannot hold back a disconnect.
    let root = browser.library_root();
    tokio::pin!(root);
    let mut root_pending = true;

    loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Stop,
            root = &mut root, if root_pending => Step::Root(root),
            next = events.recv() => Step::Event(next),
        };
        let Some(connection) = connection.upgrade() else {
            break;
        };

        match step {
            Step::Stop => break,
            Step::Root(root) => {
                root_pending = false;
                connection.on_root_resolved(root);
            }
            Step::Event(Some(SessionEvent::Player(batch))) => connection.on_player_events(&batch),
            Step::Event(Some(SessionEvent::PlayerError(error))) => {
                connection.on_player_error(error.as_ref())
            }
            Step::Event(Some(SessionEvent::Disconnected)) => {
                info!(service = %connection.token, "Playback engine disconnected");
                connection.release();
                break;
            }
            Step::Event(None) => {
                debug!(service = %connection.token, "Engine closed its event channel");
                connection.release();
                break;
            }
        }
    }
}

async fn lookup_item(
    connection: Weak<SessionConnection>,
    browser: Arc<dyn MediaBrowser>,
    item: MediaItem,
    cancel: CancellationToken,
) {
    // The transport's record may lack metadata; the browser has the full one.
    let lookup = tokio::select! {
        _ = cancel.cancelled() => return,
        lookup = browser.item(&item.media_id) => lookup,
    };
    if let Some(connection) = connection.upgrade() {
        connection.apply_lookup(item, lookup);
    }
}

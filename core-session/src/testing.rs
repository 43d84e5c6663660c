//! In-memory playback engine for tests.
//!
//! [`FakeConnector`] hands out a shared [`FakeBrowser`] whose [`FakePlayer`]
//! records every transport call. Tests drive engine callbacks with
//! [`FakeConnector::emit`].

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    Bundle, MediaBrowser, MediaItem, Player, PlayerState, SessionCommand, SessionConnector,
    SessionEvent, SessionEventSender, SessionResult, SessionToken, FolderType, MEDIA_ROOT_ID,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Transport call recorded by [`FakePlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Play,
    Pause,
    SeekTo(Option<u64>),
    SetMediaItems {
        media_ids: Vec<String>,
        start_index: usize,
        start_position_ms: Option<u64>,
    },
    Prepare,
}

#[derive(Debug, Default)]
struct PlayerSnapshot {
    state: PlayerState,
    play_when_ready: bool,
    duration_ms: Option<u64>,
    current: Option<MediaItem>,
}

#[derive(Debug, Default)]
pub struct FakePlayer {
    snapshot: Mutex<PlayerSnapshot>,
    calls: Mutex<Vec<PlayerCall>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transport(&self, state: PlayerState, play_when_ready: bool) {
        let mut snapshot = self.snapshot.lock();
        snapshot.state = state;
        snapshot.play_when_ready = play_when_ready;
    }

    pub fn set_duration(&self, duration_ms: Option<u64>) {
        self.snapshot.lock().duration_ms = duration_ms;
    }

    pub fn set_current(&self, item: Option<MediaItem>) {
        self.snapshot.lock().current = item;
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: PlayerCall) {
        self.calls.lock().push(call);
    }
}

impl Player for FakePlayer {
    fn playback_state(&self) -> PlayerState {
        self.snapshot.lock().state
    }

    fn play_when_ready(&self) -> bool {
        self.snapshot.lock().play_when_ready
    }

    fn duration_ms(&self) -> Option<u64> {
        self.snapshot.lock().duration_ms
    }

    fn current_media_item(&self) -> Option<MediaItem> {
        self.snapshot.lock().current.clone()
    }

    fn play(&self) {
        self.record(PlayerCall::Play);
    }

    fn pause(&self) {
        self.record(PlayerCall::Pause);
    }

    fn seek_to(&self, position_ms: Option<u64>) {
        self.record(PlayerCall::SeekTo(position_ms));
    }

    fn set_media_items(&self, items: Vec<MediaItem>, start_index: usize, start_position_ms: Option<u64>) {
        self.record(PlayerCall::SetMediaItems {
            media_ids: items.into_iter().map(|item| item.media_id).collect(),
            start_index,
            start_position_ms,
        });
    }

    fn prepare(&self) {
        self.record(PlayerCall::Prepare);
    }
}

pub struct FakeBrowser {
    player: Arc<FakePlayer>,
    root: MediaItem,
    children: Mutex<HashMap<String, Vec<MediaItem>>>,
    items: Mutex<HashMap<String, MediaItem>>,
    connected: AtomicBool,
    released: AtomicBool,
    commands: Mutex<Vec<SessionCommand>>,
    command_result: Mutex<SessionResult>,
    root_gate: Mutex<Option<Arc<Notify>>>,
    stall_lookups: AtomicBool,
}

impl FakeBrowser {
    pub fn new(player: Arc<FakePlayer>) -> Self {
        Self {
            player,
            root: MediaItem::builder(MEDIA_ROOT_ID)
                .title("Root")
                .folder_type(FolderType::Container)
                .build(),
            children: Mutex::new(HashMap::new()),
            items: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
            released: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            command_result: Mutex::new(SessionResult::success()),
            root_gate: Mutex::new(None),
            stall_lookups: AtomicBool::new(false),
        }
    }

    /// Children served for `parent_id`; each child also becomes lookupable.
    pub fn set_children(&self, parent_id: &str, children: Vec<MediaItem>) {
        let mut items = self.items.lock();
        for child in &children {
            items.insert(child.media_id.clone(), child.clone());
        }
        self.children.lock().insert(parent_id.to_string(), children);
    }

    pub fn set_item(&self, item: MediaItem) {
        self.items.lock().insert(item.media_id.clone(), item);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_command_result(&self, result: SessionResult) {
        *self.command_result.lock() = result;
    }

    /// Holds `library_root` until the returned gate is notified.
    pub fn gate_root(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.root_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Item lookups never complete while set.
    pub fn stall_lookups(&self, stall: bool) {
        self.stall_lookups.store(stall, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<SessionCommand> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl MediaBrowser for FakeBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.is_released()
    }

    fn player(&self) -> Arc<dyn Player> {
        self.player.clone()
    }

    async fn library_root(&self) -> Result<MediaItem> {
        let gate = self.root_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.root.clone())
    }

    async fn children(&self, parent_id: &str, page: u32, page_size: u32) -> Result<Vec<MediaItem>> {
        let children = self.children.lock();
        Ok(children
            .get(parent_id)
            .map(|all| {
                all.iter()
                    .skip(page as usize * page_size as usize)
                    .take(page_size as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn item(&self, media_id: &str) -> Result<Option<MediaItem>> {
        if self.stall_lookups.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.items.lock().get(media_id).cloned())
    }

    async fn send_custom_command(&self, command: SessionCommand, _args: Bundle) -> Result<SessionResult> {
        self.commands.lock().push(command);
        Ok(self.command_result.lock().clone())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    browser: Arc<FakeBrowser>,
    failure: Option<String>,
    events: Mutex<Option<SessionEventSender>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(browser: Arc<FakeBrowser>) -> Self {
        Self {
            browser,
            failure: None,
            events: Mutex::new(None),
            connects: AtomicUsize::new(0),
        }
    }

    /// Connector whose handshake always fails with `message`.
    pub fn failing(browser: Arc<FakeBrowser>, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(browser)
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Deliver an engine callback. Returns `false` if no listener is attached.
    pub async fn emit(&self, event: SessionEvent) -> bool {
        let sender = self.events.lock().clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drop the engine's end of the event channel.
    pub fn close_events(&self) {
        self.events.lock().take();
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, _token: &SessionToken, events: SessionEventSender) -> Result<Arc<dyn MediaBrowser>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(BridgeError::NotAvailable(message.clone()));
        }
        *self.events.lock() = Some(events);
        Ok(self.browser.clone())
    }
}

/// Player, browser and connector wired together.
pub fn fake_engine() -> (Arc<FakePlayer>, Arc<FakeBrowser>, Arc<FakeConnector>) {
    let player = Arc::new(FakePlayer::new());
    let browser = Arc::new(FakeBrowser::new(Arc::clone(&player)));
    let connector = Arc::new(FakeConnector::new(Arc::clone(&browser)));
    (player, browser, connector)
}

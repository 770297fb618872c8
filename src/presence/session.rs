//! The connection/presence state machine

use crate::rpc::{Presence, StatusConnector};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Connectivity to the status service; exactly one state holds at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// A connection attempt is in flight; guards against overlapping dials
    Connecting,
    Connected,
}

/// Timer intervals for the background loops
///
/// The reconnect interval should be longer than the heartbeat interval; the
/// heartbeat exists to out-pace the remote side's inactivity expiry.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub heartbeat_interval: Duration,
    pub reconnect_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            reconnect_interval: Duration::from_secs(30),
        }
    }
}

/// Counters for the current logical agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Unix timestamp the elapsed clock counts from
    pub session_start: i64,
    pub files_edited: u64,
    pub commands_run: u64,
}

struct Inner {
    state: ConnectionState,
    /// Most recently requested payload, kept across disconnects so it can be
    /// replayed after a reconnect
    last_presence: Option<Presence>,
    session_start: i64,
    files_edited: u64,
    commands_run: u64,
    sink: Option<Box<dyn crate::rpc::StatusSink>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

struct Shared {
    project_name: String,
    connector: Box<dyn StatusConnector>,
    options: SessionOptions,
    /// One-way latch; once set, no further connection attempts or timers
    destroyed: AtomicBool,
    inner: Mutex<Inner>,
}

/// One presence session per host process
///
/// Cheap to clone; all clones share the same connection and cache. Every
/// operation is best-effort: failures degrade connectivity state and are
/// recovered by the reconnect loop, never surfaced to the caller.
#[derive(Clone)]
pub struct PresenceSession {
    shared: Arc<Shared>,
}

impl PresenceSession {
    pub fn new(
        project_name: impl Into<String>,
        connector: Box<dyn StatusConnector>,
        options: SessionOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                project_name: project_name.into(),
                connector,
                options,
                destroyed: AtomicBool::new(false),
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    last_presence: None,
                    session_start: Utc::now().timestamp(),
                    files_edited: 0,
                    commands_run: 0,
                    sink: None,
                    heartbeat: None,
                    reconnect: None,
                }),
            }),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.shared.project_name
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.shared.inner.lock().await.state
    }

    /// The cached payload the heartbeat and reconnect replay will re-send
    pub async fn last_presence(&self) -> Option<Presence> {
        self.shared.inner.lock().await.last_presence.clone()
    }

    pub async fn stats(&self) -> SessionStats {
        let inner = self.shared.inner.lock().await;
        SessionStats {
            session_start: inner.session_start,
            files_edited: inner.files_edited,
            commands_run: inner.commands_run,
        }
    }

    /// Establish the connection; idempotent
    ///
    /// Returns true if already connected or the handshake succeeded, false
    /// while another attempt is in flight, after destruction, or on failure
    /// (which schedules the reconnect loop).
    pub async fn connect(&self) -> bool {
        if self.is_destroyed() {
            return false;
        }

        let previous = {
            let mut inner = self.shared.inner.lock().await;
            match inner.state {
                ConnectionState::Connected => return true,
                ConnectionState::Connecting => return false,
                ConnectionState::Disconnected => {}
            }
            inner.state = ConnectionState::Connecting;
            inner.sink.take()
        };

        // Stale handle from a dead connection; close errors are meaningless
        if let Some(mut sink) = previous {
            sink.close().await;
        }

        let attempt = self.shared.connector.connect().await;

        let mut inner = self.shared.inner.lock().await;
        if self.is_destroyed() {
            inner.state = ConnectionState::Disconnected;
            if let Ok(mut sink) = attempt {
                sink.close().await;
            }
            return false;
        }

        match attempt {
            Ok(sink) => {
                inner.sink = Some(sink);
                inner.state = ConnectionState::Connected;
                tracing::info!("Connected to status service");

                // Replay what the caller last asked for; a failure here
                // demotes again but does not fail the connect itself
                if let Some(presence) = inner.last_presence.clone() {
                    self.send_presence(&mut inner, &presence).await;
                }

                if inner.state == ConnectionState::Connected {
                    if let Some(stale) = inner.heartbeat.replace(self.spawn_heartbeat()) {
                        stale.abort();
                    }
                    if let Some(handle) = inner.reconnect.take() {
                        handle.abort();
                    }
                }
                true
            }
            Err(err) => {
                tracing::debug!("Status service connect failed: {}", err);
                inner.state = ConnectionState::Disconnected;
                self.ensure_reconnect(&mut inner);
                false
            }
        }
    }

    /// Request a presence update; never blocks on delivery outcome
    ///
    /// The payload is cached before any send is attempted, so the latest
    /// call always wins regardless of how in-flight sends interleave, and a
    /// later reconnect replays exactly this payload.
    pub async fn update(&self, state: &str, detail: &str) {
        if self.is_destroyed() {
            return;
        }

        let mut inner = self.shared.inner.lock().await;
        let details = if detail.is_empty() {
            format!("Working on {}", self.shared.project_name)
        } else {
            format!("{} · {}", self.shared.project_name, detail)
        };
        let presence = Presence {
            details,
            state: state.to_string(),
            start: inner.session_start,
        };
        inner.last_presence = Some(presence.clone());

        if inner.state == ConnectionState::Connected {
            self.send_presence(&mut inner, &presence).await;
        } else {
            drop(inner);
            // The success path of connect replays the payload just cached
            self.connect().await;
        }
    }

    /// Drop the cached presence and clear the remote status if connected
    pub async fn clear(&self) {
        if self.is_destroyed() {
            return;
        }

        let mut inner = self.shared.inner.lock().await;
        inner.last_presence = None;

        if inner.state == ConnectionState::Connected {
            if let Some(sink) = inner.sink.as_mut() {
                if let Err(err) = sink.clear_status().await {
                    tracing::debug!("Status clear failed, treating as disconnect: {}", err);
                    self.demote(&mut inner);
                }
            }
        }
    }

    /// Start a new logical agent session: new elapsed anchor, zeroed counters
    ///
    /// Does not touch connectivity or the cached presence.
    pub async fn reset_session(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.session_start = Utc::now().timestamp();
        inner.files_edited = 0;
        inner.commands_run = 0;
    }

    pub async fn record_file_edit(&self) {
        self.shared.inner.lock().await.files_edited += 1;
    }

    pub async fn record_command(&self) {
        self.shared.inner.lock().await.commands_run += 1;
    }

    /// Terminal teardown: stops timers, clears the remote status, closes the
    /// handle; all failures swallowed
    pub async fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut inner = self.shared.inner.lock().await;
        if let Some(handle) = inner.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = inner.reconnect.take() {
            handle.abort();
        }
        inner.state = ConnectionState::Disconnected;
        inner.last_presence = None;

        if let Some(mut sink) = inner.sink.take() {
            let _ = sink.clear_status().await;
            sink.close().await;
        }
    }

    /// Teardown variant for signal handlers: must not await anything
    ///
    /// Cancels timers and drops the handle (dropping closes the socket). If
    /// the state lock is held by an in-flight operation, that operation
    /// observes the latch at its next check and the loops exit on their next
    /// tick.
    pub fn destroy_sync(&self) {
        self.shared.destroyed.store(true, Ordering::SeqCst);

        let Ok(mut inner) = self.shared.inner.try_lock() else {
            return;
        };
        if let Some(handle) = inner.heartbeat.take() {
            handle.abort();
        }
        if let Some(handle) = inner.reconnect.take() {
            handle.abort();
        }
        inner.state = ConnectionState::Disconnected;
        inner.last_presence = None;
        inner.sink = None;
    }

    async fn is_connected(&self) -> bool {
        self.shared.inner.lock().await.state == ConnectionState::Connected
    }

    /// Send primitive: a failed send always means the connection is gone,
    /// never that the payload was bad
    async fn send_presence(&self, inner: &mut Inner, presence: &Presence) -> bool {
        let Some(sink) = inner.sink.as_mut() else {
            self.demote(inner);
            return false;
        };
        match sink.set_status(presence).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("Status send failed, treating as disconnect: {}", err);
                self.demote(inner);
                false
            }
        }
    }

    fn demote(&self, inner: &mut Inner) {
        inner.state = ConnectionState::Disconnected;
        inner.sink = None;
        if let Some(handle) = inner.heartbeat.take() {
            handle.abort();
        }
        self.ensure_reconnect(inner);
    }

    fn ensure_reconnect(&self, inner: &mut Inner) {
        if self.is_destroyed() {
            return;
        }
        let running = inner
            .reconnect
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if !running {
            inner.reconnect = Some(self.spawn_reconnect());
        }
    }

    /// While connected, periodically re-send the cached presence verbatim;
    /// the remote side silently expires a status after a period of silence.
    ///
    /// The loop holds only a weak handle, so a dropped session tears it down.
    fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let interval = self.shared.options.heartbeat_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(shared) = weak.upgrade() else { break };
                let session = PresenceSession { shared };
                if session.is_destroyed() {
                    break;
                }
                let mut inner = session.shared.inner.lock().await;
                if inner.state != ConnectionState::Connected {
                    break;
                }
                let Some(presence) = inner.last_presence.clone() else {
                    continue;
                };
                if !session.send_presence(&mut inner, &presence).await {
                    break;
                }
            }
        })
    }

    /// While disconnected, periodically retry the handshake; stops the
    /// moment a connection is established or the session is destroyed
    fn spawn_reconnect(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let interval = self.shared.options.reconnect_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(shared) = weak.upgrade() else { break };
                let session = PresenceSession { shared };
                if session.is_destroyed() || session.is_connected().await {
                    break;
                }
                if session.connect().await && session.is_connected().await {
                    break;
                }
            }
        })
    }
}

//! Realtime transport — persistent WebSocket connection with
//! connection-time authentication, channel subscription, and bounded
//! automatic reconnection.
//!
//! Exactly one connection attempt is ever in flight. Every spawned
//! session carries the epoch it was started under; any socket event,
//! timer, or in-flight message whose epoch no longer matches the
//! transport's current epoch is ignored, so a reconnection timer racing
//! a manual `connect()`/`disconnect()` can never produce two live
//! sockets or a late publish after sign-out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use tradedesk_core::config::notifications::NotificationsConfig;
use tradedesk_core::types::auth::Credentials;

use crate::dispatch::NotificationHub;
use crate::message::ClientFrame;
use crate::message::ServerEnvelope;
use crate::normalize;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No socket and no pending attempt.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Socket open, authenticate frame not yet acknowledged.
    Connected,
    /// Authenticate frame sent, awaiting acknowledgement.
    Authenticating,
    /// Authenticated and subscribed to the session's channels.
    Authenticated,
    /// Waiting out the fixed delay before the next attempt.
    Reconnecting,
}

impl TransportState {
    /// Lowercase name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TransportInner {
    /// WebSocket URL derived from configuration.
    ws_url: String,
    /// Reconnection policy.
    config: NotificationsConfig,
    /// Dispatch hub receiving every normalized record.
    hub: Arc<NotificationHub>,
    /// Current lifecycle state.
    state: Mutex<TransportState>,
    /// Current session credential.
    credentials: Mutex<Option<Credentials>>,
    /// Connection identity; bumped on every connect/disconnect so stale
    /// tasks and in-flight messages can be ignored.
    epoch: AtomicU64,
    /// Outbound frame queue of the live session, if any.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl fmt::Debug for TransportInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportInner")
            .field("ws_url", &self.ws_url)
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}

impl TransportInner {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn current_state(&self) -> TransportState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the state only while `epoch` is still the live connection.
    fn set_state(&self, epoch: u64, state: TransportState) {
        if !self.is_current(epoch) {
            return;
        }
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = state;
    }

    fn outbound_sender(&self) -> Option<mpsc::UnboundedSender<Message>> {
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install a session's outbound sender. Refused when `epoch` is no
    /// longer the live connection, so a session invalidated mid-setup
    /// cannot overwrite a newer session's slot.
    fn install_outbound(&self, epoch: u64, tx: &mpsc::UnboundedSender<Message>) -> bool {
        let mut out = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(epoch) {
            return false;
        }
        *out = Some(tx.clone());
        true
    }
}

/// Client-side realtime transport. Cheap to clone; all clones share the
/// same connection state.
#[derive(Debug, Clone)]
pub struct RealtimeTransport {
    inner: Arc<TransportInner>,
}

impl RealtimeTransport {
    /// Create a transport. No connection is attempted until
    /// [`connect`](Self::connect) or
    /// [`update_auth`](Self::update_auth) is called.
    pub fn new(ws_url: String, config: NotificationsConfig, hub: Arc<NotificationHub>) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                ws_url,
                config,
                hub,
                state: Mutex::new(TransportState::Disconnected),
                credentials: Mutex::new(None),
                epoch: AtomicU64::new(0),
                outbound: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state snapshot.
    pub fn state(&self) -> TransportState {
        self.inner.current_state()
    }

    /// Open the connection. No-op when already active or when no
    /// credential is available.
    pub fn connect(&self) {
        let credentials = {
            let guard = self
                .inner
                .credentials
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        let Some(credentials) = credentials else {
            debug!("Connect skipped: no session credential");
            return;
        };

        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != TransportState::Disconnected {
                debug!(state = %*state, "Connect skipped: transport already active");
                return;
            }
            *state = TransportState::Connecting;
        }

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_connection(inner, epoch, credentials));
    }

    /// Replace the session credential. With a credential, (re)connects;
    /// with `None`, disconnects and clears the listener registry (the
    /// sign-out contract). Idempotent either way.
    pub fn update_auth(&self, credentials: Option<Credentials>) {
        {
            let mut guard = self
                .inner
                .credentials
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *guard = credentials.clone();
        }

        match credentials {
            Some(_) => {
                self.reset(false);
                self.connect();
            }
            None => self.disconnect(),
        }
    }

    /// Close the socket, clear the listener registry, and stop any
    /// pending reconnection. Messages the socket delivers in flight
    /// after this call are ignored.
    pub fn disconnect(&self) {
        self.reset(true);
        info!("Realtime transport disconnected");
    }

    /// Invalidate the live connection/timers. Clearing listeners is the
    /// sign-out path; credential refreshes keep them.
    fn reset(&self, clear_listeners: bool) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let outbound = {
            let mut out = self.inner.outbound.lock().unwrap_or_else(|e| e.into_inner());
            out.take()
        };
        if let Some(tx) = outbound {
            // Close the live socket instead of waiting for the stale
            // session to notice the epoch change on its next frame.
            let _ = tx.send(Message::Close(None));
        }
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            *state = TransportState::Disconnected;
        }
        if clear_listeners {
            self.inner.hub.clear();
        }
    }
}

/// Connection driver: one attempt plus the bounded retry loop.
async fn run_connection(inner: Arc<TransportInner>, epoch: u64, credentials: Credentials) {
    let max_attempts = inner.config.reconnect_max_attempts;
    let delay = Duration::from_secs(inner.config.reconnect_delay_seconds);
    let mut attempts: u32 = 0;

    loop {
        if !inner.is_current(epoch) {
            return;
        }

        match connect_async(inner.ws_url.as_str()).await {
            Ok((stream, _)) => {
                if !inner.is_current(epoch) {
                    return;
                }
                attempts = 0;
                inner.set_state(epoch, TransportState::Connected);
                run_session(&inner, epoch, &credentials, stream).await;
                if !inner.is_current(epoch) {
                    return;
                }
                debug!("Transport session ended");
            }
            Err(e) => {
                if !inner.is_current(epoch) {
                    return;
                }
                warn!(error = %e, url = %inner.ws_url, "WebSocket connection failed");
            }
        }

        attempts += 1;
        if attempts > max_attempts {
            error!(
                attempts = max_attempts,
                "Reconnection attempts exhausted; transport stays down until connect() is called again"
            );
            inner.set_state(epoch, TransportState::Disconnected);
            return;
        }

        inner.set_state(epoch, TransportState::Reconnecting);
        info!(
            attempt = attempts,
            max = max_attempts,
            delay_seconds = inner.config.reconnect_delay_seconds,
            "Scheduling reconnection attempt"
        );
        tokio::time::sleep(delay).await;
        if !inner.is_current(epoch) {
            return;
        }
        inner.set_state(epoch, TransportState::Connecting);
    }
}

/// One established socket session: authenticate, subscribe on ack, pump
/// messages until close.
async fn run_session(
    inner: &Arc<TransportInner>,
    epoch: u64,
    credentials: &Credentials,
    stream: WsStream,
) {
    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    if !inner.install_outbound(epoch, &tx) {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    inner.set_state(epoch, TransportState::Authenticating);
    let auth = ClientFrame::Authenticate {
        token: credentials.token.clone(),
        user_type: credentials.user_type.as_str().to_string(),
        user_id: credentials.user_id.clone(),
    };
    send_frame(&tx, &auth);

    while let Some(message) = read.next().await {
        if !inner.is_current(epoch) {
            break;
        }
        match message {
            Ok(Message::Text(text)) => {
                handle_text(inner, epoch, credentials, text.as_str()).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => {
                debug!("Server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "WebSocket read error");
                break;
            }
        }
    }

    // Drop our session's sender so the writer drains and closes the
    // socket; leave the slot alone if a newer session owns it already.
    if inner.is_current(epoch) {
        let mut out = inner.outbound.lock().unwrap_or_else(|e| e.into_inner());
        *out = None;
    }
    drop(tx);
    let _ = writer.await;
}

/// Process one text frame from the server.
async fn handle_text(inner: &Arc<TransportInner>, epoch: u64, credentials: &Credentials, text: &str) {
    let envelope: ServerEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            debug!(error = %e, "Failed to parse server message");
            return;
        }
    };

    if envelope.event_type == normalize::EVENT_AUTHENTICATED {
        info!(user_type = %credentials.user_type, "Transport authenticated; subscribing channels");
        inner.set_state(epoch, TransportState::Authenticated);
        if let Some(tx) = inner.outbound_sender() {
            for channel in credentials.user_type.channels() {
                send_frame(
                    &tx,
                    &ClientFrame::Subscribe {
                        channel: (*channel).to_string(),
                    },
                );
            }
        }
        return;
    }

    if let Some(record) = normalize::normalize(&envelope) {
        if !inner.is_current(epoch) {
            return;
        }
        inner.hub.publish(&record).await;
    }
}

fn send_frame(tx: &mpsc::UnboundedSender<Message>, frame: &ClientFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            let _ = tx.send(Message::text(json));
        }
        Err(e) => error!(error = %e, "Failed to serialize client frame"),
    }
}

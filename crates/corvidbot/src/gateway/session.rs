//! Gateway session with automatic reconnection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use corvid_proto::{GatewayEvent, GatewayPayload, Hello, Identify, Interaction, Ready};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::events::SessionEvent;
use super::heartbeat::{start_heartbeat_task, HeartbeatCommand, HeartbeatConfig, HeartbeatHandle};
use super::reconnect::ReconnectPolicy;
use super::state::{AtomicSessionState, SessionState};
use crate::error::BotError;

/// How long to wait for the hello frame after the socket opens.
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// A gateway session with automatic reconnection.
///
/// [`start`](Self::start) spawns the connection loop and returns the
/// event stream. The loop owns the socket: it performs the
/// hello/identify handshake, pumps heartbeats, decodes dispatches, and
/// reconnects with backoff until stopped or the budget runs out.
pub struct GatewaySession {
    url: String,
    identify: Identify,
    pub(crate) reconnect_policy: ReconnectPolicy,
    pub(crate) heartbeat_config: HeartbeatConfig,
    pub(crate) state: Arc<AtomicSessionState>,
    pub(crate) running: Arc<AtomicBool>,
    seq: Arc<AtomicU64>,
    session_id: Arc<Mutex<Option<String>>>,
    stop_signal: Arc<Notify>,
}

impl GatewaySession {
    /// Create a new session for the given gateway URL and identify body.
    #[must_use]
    pub fn new(url: impl Into<String>, identify: Identify) -> Self {
        Self {
            url: url.into(),
            identify,
            reconnect_policy: ReconnectPolicy::default(),
            heartbeat_config: HeartbeatConfig::default(),
            state: Arc::new(AtomicSessionState::new(SessionState::Disconnected)),
            running: Arc::new(AtomicBool::new(false)),
            seq: Arc::new(AtomicU64::new(0)),
            session_id: Arc::new(Mutex::new(None)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    /// Configure reconnection behavior.
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    /// Configure heartbeat behavior. The interval is still overridden by
    /// the hello frame on every connect.
    #[must_use]
    pub fn with_heartbeat_config(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat_config = config;
        self
    }

    /// Get the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Check if the session loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Last dispatch sequence number observed, 0 before the first.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Session id assigned by the platform on READY. `None` until the
    /// first READY of the current connection.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|guard| guard.clone())
    }

    /// Stop the session. The connection closes and no reconnect follows.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.state.store(SessionState::Closed);
        self.stop_signal.notify_one();
    }

    /// Start the session loop.
    ///
    /// Returns the receiver for session events. The loop runs until
    /// [`stop`](Self::stop) is called or the reconnect budget is
    /// exhausted.
    pub fn start(&self) -> mpsc::Receiver<SessionEvent> {
        self.running.store(true, Ordering::SeqCst);

        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(32);

        let url = self.url.clone();
        let identify = self.identify.clone();
        let reconnect_policy = self.reconnect_policy.clone();
        let heartbeat_config = self.heartbeat_config.clone();
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let seq = Arc::clone(&self.seq);
        let session_id = Arc::clone(&self.session_id);
        let stop_signal = Arc::clone(&self.stop_signal);

        tokio::spawn(async move {
            Self::connection_loop(
                url,
                identify,
                reconnect_policy,
                heartbeat_config,
                state,
                running,
                seq,
                session_id,
                stop_signal,
                event_tx,
            )
            .await;
        });

        event_rx
    }

    #[allow(clippy::too_many_arguments)]
    async fn connection_loop(
        url: String,
        identify: Identify,
        reconnect_policy: ReconnectPolicy,
        heartbeat_config: HeartbeatConfig,
        state: Arc<AtomicSessionState>,
        running: Arc<AtomicBool>,
        seq: Arc<AtomicU64>,
        session_id: Arc<Mutex<Option<String>>>,
        stop_signal: Arc<Notify>,
        event_tx: mpsc::Sender<SessionEvent>,
    ) {
        let mut attempt = 0u32;

        while running.load(Ordering::SeqCst) {
            state.store(SessionState::Connecting);

            let cycle_error = match Self::establish(&url, &identify, &state).await {
                Ok((write, read, hello)) => {
                    info!(
                        heartbeat_interval_ms = hello.heartbeat_interval,
                        "gateway handshake complete"
                    );

                    let hb_config = HeartbeatConfig {
                        interval: Duration::from_millis(hello.heartbeat_interval),
                        max_missed_acks: heartbeat_config.max_missed_acks,
                    };
                    let (hb_tx, hb_rx) = mpsc::channel::<HeartbeatCommand>(8);
                    let heartbeat = start_heartbeat_task(Arc::clone(&seq), hb_tx.clone(), hb_config);

                    let reason = Self::run_connection(
                        read,
                        write,
                        hb_rx,
                        &heartbeat,
                        &mut attempt,
                        &state,
                        &running,
                        &seq,
                        &session_id,
                        &stop_signal,
                        &event_tx,
                    )
                    .await;

                    heartbeat.shutdown().await;

                    // The next connection identifies from scratch, so the
                    // old sequence and session id must not leak into it.
                    seq.store(0, Ordering::SeqCst);
                    if let Ok(mut guard) = session_id.lock() {
                        *guard = None;
                    }

                    if !running.load(Ordering::SeqCst) {
                        debug!(%reason, "session stopped");
                        break;
                    }

                    state.store(SessionState::Disconnected);
                    warn!(%reason, "gateway connection lost");
                    let _ = event_tx
                        .send(SessionEvent::Disconnected {
                            reason: reason.clone(),
                        })
                        .await;
                    reason
                }
                Err(e) => {
                    warn!(error = %e, "gateway connect failed");
                    e.to_string()
                }
            };

            if !running.load(Ordering::SeqCst) {
                break;
            }

            attempt += 1;
            if !reconnect_policy.should_reconnect(attempt) {
                state.store(SessionState::Closed);
                running.store(false, Ordering::SeqCst);
                let _ = event_tx
                    .send(SessionEvent::ReconnectFailed {
                        attempts: attempt,
                        last_error: cycle_error,
                    })
                    .await;
                break;
            }

            state.store(SessionState::Reconnecting);
            let delay = reconnect_policy.next_delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
            let _ = event_tx
                .send(SessionEvent::Reconnecting { attempt, delay })
                .await;

            tokio::select! {
                () = sleep(delay) => {}
                () = stop_signal.notified() => break,
            }
        }
    }

    /// Open the socket, wait for hello, and send identify.
    async fn establish(
        url: &str,
        identify: &Identify,
        state: &AtomicSessionState,
    ) -> Result<(WsSink, WsStream, Hello), BotError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BotError::Gateway(format!("connect failed: {e}")))?;

        let (mut write, mut read) = ws_stream.split();

        let hello = timeout(HELLO_TIMEOUT, Self::read_hello(&mut read))
            .await
            .map_err(|_| BotError::Gateway("timed out waiting for hello".to_string()))??;

        state.store(SessionState::Identifying);
        let json = GatewayPayload::identify(identify)?.to_json()?;
        write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| BotError::Gateway(format!("identify send failed: {e}")))?;

        Ok((write, read, hello))
    }

    /// Read frames until the hello arrives. The platform sends it first;
    /// anything else is a handshake failure.
    async fn read_hello(read: &mut WsStream) -> Result<Hello, BotError> {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let event = GatewayEvent::from_json(&text)
                        .map_err(|e| BotError::Gateway(format!("bad handshake frame: {e}")))?;
                    return match event {
                        GatewayEvent::Hello(hello) => Ok(hello),
                        other => Err(BotError::Gateway(format!(
                            "expected hello as first frame, got {other:?}"
                        ))),
                    };
                }
                Some(Ok(Message::Close(_))) => {
                    return Err(BotError::Gateway(
                        "server closed connection during handshake".to_string(),
                    ));
                }
                Some(Ok(_)) => {
                    // Ping/Pong/Binary before hello; keep waiting.
                }
                Some(Err(e)) => return Err(BotError::Gateway(format!("WebSocket error: {e}"))),
                None => {
                    return Err(BotError::Gateway("connection closed before hello".to_string()));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_connection(
        mut read: WsStream,
        mut write: WsSink,
        mut heartbeat_rx: mpsc::Receiver<HeartbeatCommand>,
        heartbeat: &HeartbeatHandle,
        attempt: &mut u32,
        state: &AtomicSessionState,
        running: &AtomicBool,
        seq: &AtomicU64,
        session_id: &Mutex<Option<String>>,
        stop_signal: &Notify,
        event_tx: &mpsc::Sender<SessionEvent>,
    ) -> String {
        loop {
            if !running.load(Ordering::SeqCst) {
                let _ = write.send(Message::Close(None)).await;
                return "client stopped".to_string();
            }

            tokio::select! {
                _ = stop_signal.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    return "client stopped".to_string();
                }

                // Read from WebSocket
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match GatewayEvent::from_json(&text) {
                                Ok(event) => {
                                    if Self::handle_event(
                                        event, heartbeat, attempt, state, seq, session_id, event_tx,
                                    )
                                    .await
                                    .is_err()
                                    {
                                        return "event channel closed".to_string();
                                    }
                                }
                                Err(e) => {
                                    // Parse error, log but continue
                                    warn!(error = %e, "failed to parse gateway frame");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            if write.send(Message::Pong(payload)).await.is_err() {
                                return "write failed".to_string();
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            return "server closed connection".to_string();
                        }
                        Some(Err(e)) => {
                            return format!("WebSocket error: {e}");
                        }
                        None => {
                            return "connection closed".to_string();
                        }
                        _ => {
                            // Ignore other message types (Pong, Binary)
                        }
                    }
                }

                // Pump heartbeat probes onto the socket
                cmd = heartbeat_rx.recv() => {
                    match cmd {
                        Some(HeartbeatCommand::Beat(frame)) => {
                            match frame.to_json() {
                                Ok(json) => {
                                    if write.send(Message::Text(json.into())).await.is_err() {
                                        return "write failed".to_string();
                                    }
                                }
                                Err(e) => warn!(error = %e, "failed to encode heartbeat"),
                            }
                        }
                        Some(HeartbeatCommand::ConnectionDead { missed }) => {
                            let _ = write.send(Message::Close(None)).await;
                            return format!("heartbeat liveness lost after {missed} missed acks");
                        }
                        None => {
                            // Heartbeat task gone; the read side decides what happens next.
                        }
                    }
                }
            }
        }
    }

    async fn handle_event(
        event: GatewayEvent,
        heartbeat: &HeartbeatHandle,
        attempt: &mut u32,
        state: &AtomicSessionState,
        seq: &AtomicU64,
        session_id: &Mutex<Option<String>>,
        event_tx: &mpsc::Sender<SessionEvent>,
    ) -> Result<(), mpsc::error::SendError<SessionEvent>> {
        match event {
            GatewayEvent::HeartbeatAck => {
                heartbeat.ack_received();
            }
            GatewayEvent::Hello(hello) => {
                debug!(
                    heartbeat_interval_ms = hello.heartbeat_interval,
                    "unexpected hello after handshake"
                );
            }
            GatewayEvent::Dispatch {
                event,
                seq: frame_seq,
                data,
            } => {
                if let Some(n) = frame_seq {
                    // The sequence never regresses within a connection.
                    let prev = seq.fetch_max(n, Ordering::SeqCst);
                    if n < prev {
                        debug!(seq = n, prev, "ignoring regressed sequence number");
                    }
                }

                if event == "READY" {
                    *attempt = 0;
                    state.store(SessionState::Connected);
                    match serde_json::from_value::<Ready>(data) {
                        Ok(ready) => {
                            if let Ok(mut guard) = session_id.lock() {
                                *guard = Some(ready.session_id.clone());
                            }
                            info!(session_id = %ready.session_id, "session ready");
                            event_tx.send(SessionEvent::Ready(ready)).await?;
                        }
                        Err(e) => warn!(error = %e, "failed to decode READY"),
                    }
                } else if event == "INTERACTION_CREATE" {
                    match Interaction::from_dispatch(data) {
                        Ok(interaction) => {
                            event_tx.send(SessionEvent::Interaction(interaction)).await?;
                        }
                        Err(e) => warn!(error = %e, "failed to decode interaction"),
                    }
                } else {
                    event_tx.send(SessionEvent::Event { name: event, data }).await?;
                }
            }
            GatewayEvent::Unknown { op } => {
                debug!(op, "ignoring unhandled opcode");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identify() -> Identify {
        Identify::new("test-token", 513, 0, 1)
    }

    #[test]
    fn test_session_creation() {
        let session = GatewaySession::new("wss://gateway.example.test", test_identify());

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_running());
        assert_eq!(session.sequence(), 0);
        assert_eq!(session.session_id(), None);
    }

    #[test]
    fn test_session_with_reconnect_policy() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 1.5,
            jitter: Duration::ZERO,
            max_attempts: 3,
        };

        let session = GatewaySession::new("wss://gateway.example.test", test_identify())
            .with_reconnect_policy(policy);

        assert_eq!(
            session.reconnect_policy.base_delay,
            Duration::from_millis(100)
        );
        assert_eq!(session.reconnect_policy.max_attempts, 3);
    }

    #[test]
    fn test_session_with_heartbeat_config() {
        let session = GatewaySession::new("wss://gateway.example.test", test_identify())
            .with_heartbeat_config(HeartbeatConfig {
                interval: Duration::from_secs(15),
                max_missed_acks: 2,
            });

        assert_eq!(session.heartbeat_config.max_missed_acks, 2);
    }

    #[test]
    fn test_session_stop() {
        let session = GatewaySession::new("wss://gateway.example.test", test_identify());

        session.running.store(true, Ordering::SeqCst);
        session.state.store(SessionState::Connected);

        session.stop();

        assert!(!session.is_running());
        assert_eq!(session.state(), SessionState::Closed);
    }
}

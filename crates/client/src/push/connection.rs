//! Managed WebSocket connection with state tracking, bounded exponential
//! backoff and a heartbeat staleness watchdog.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use questline_shared::PushEvent;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::dispatcher::Dispatcher;

/// How often the loop re-polls the session accessor while unauthenticated.
const SESSION_POLL: Duration = Duration::from_secs(1);
/// Fixed delay before a forced (watchdog or manual) reconnect.
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Connection state for the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    /// Automatic retries exhausted; only a manual reconnect leaves this state.
    Failed {
        reason: String,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Snapshot of the connection published through a watch channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.state.is_connecting()
    }

    /// Most recent connection error, terminal or transient.
    pub fn error(&self) -> Option<&str> {
        if let ConnectionState::Failed { reason } = &self.state {
            return Some(reason);
        }
        self.last_error.as_deref()
    }
}

/// Configuration for auto-reconnect behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Automatic retries after a transport failure before giving up.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }
}

/// Heartbeat watchdog configuration.
///
/// Push channels can look open while the server has stopped delivering; the
/// watchdog declares the channel dead when heartbeats go quiet and forces a
/// reconnect without waiting for a transport error.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub check_interval: Duration,
    pub stale_after: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            stale_after: Duration::from_secs(35),
        }
    }
}

enum Control {
    Reconnect,
    Disconnect,
}

/// An owned push connection with an explicit lifecycle: spawning it connects,
/// [`PushConnection::disconnect`] or dropping it tears everything down,
/// including any pending retry timer.
pub struct PushConnection {
    status_rx: watch::Receiver<ConnectionStatus>,
    ctrl_tx: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl PushConnection {
    /// Open the channel and keep it alive in a background task.
    ///
    /// `url_builder` is called before every connection attempt and re-checked
    /// on every watchdog tick while connected; returning `None` means no
    /// authenticated identity is available, so the loop idles in
    /// `Disconnected` (closing any open channel first) until one appears.
    pub fn spawn(
        url_builder: impl Fn() -> Option<String> + Send + Sync + 'static,
        dispatcher: Arc<Dispatcher>,
        reconnect: ReconnectConfig,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(
            Arc::new(url_builder),
            dispatcher,
            reconnect,
            heartbeat,
            status_tx,
            ctrl_rx,
        ));

        Self {
            status_rx,
            ctrl_tx,
            task,
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch channel for reacting to status changes (e.g. a UI indicator).
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Force a teardown-and-reconnect, bypassing backoff. Also the way out of
    /// the terminal `Failed` state.
    pub fn reconnect(&self) {
        let _ = self.ctrl_tx.send(Control::Reconnect);
    }

    /// Close the channel, cancel any pending retry and reset to the initial
    /// disconnected state.
    pub fn disconnect(&self) {
        let _ = self.ctrl_tx.send(Control::Disconnect);
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        let _ = self.ctrl_tx.send(Control::Disconnect);
        self.task.abort();
    }
}

enum Session {
    TransportLost(String),
    Stale,
    IdentityLost,
    ManualReconnect,
    Disconnect,
}

enum Wait {
    Elapsed,
    Reconnect,
    Disconnect,
}

async fn wait_or_ctrl(ctrl: &mut mpsc::UnboundedReceiver<Control>, delay: Duration) -> Wait {
    tokio::select! {
        _ = tokio::time::sleep(delay) => Wait::Elapsed,
        msg = ctrl.recv() => match msg {
            Some(Control::Reconnect) => Wait::Reconnect,
            Some(Control::Disconnect) | None => Wait::Disconnect,
        },
    }
}

async fn run(
    url_builder: Arc<dyn Fn() -> Option<String> + Send + Sync>,
    dispatcher: Arc<Dispatcher>,
    reconnect: ReconnectConfig,
    heartbeat: HeartbeatConfig,
    status: watch::Sender<ConnectionStatus>,
    mut ctrl: mpsc::UnboundedReceiver<Control>,
) {
    let mut attempt = 0u32;

    'outer: loop {
        let Some(url) = url_builder() else {
            // No authenticated identity; idle and re-poll.
            status.send_modify(|s| s.state = ConnectionState::Disconnected);
            match wait_or_ctrl(&mut ctrl, SESSION_POLL).await {
                Wait::Elapsed => continue,
                Wait::Reconnect => {
                    attempt = 0;
                    continue;
                }
                Wait::Disconnect => break,
            }
        };

        status.send_modify(|s| {
            s.state = if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            };
        });

        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                attempt = 0;
                status.send_modify(|s| {
                    s.state = ConnectionState::Connected;
                    s.last_heartbeat = Some(Utc::now());
                    s.last_error = None;
                });
                tracing::info!("push channel connected");

                match drive_connected(
                    stream,
                    url_builder.as_ref(),
                    &dispatcher,
                    &heartbeat,
                    &status,
                    &mut ctrl,
                )
                .await
                {
                    Session::Disconnect => break,
                    Session::IdentityLost => {
                        // Back to the idle arm, which polls for a session.
                        status.send_modify(|s| s.state = ConnectionState::Disconnected);
                        attempt = 0;
                        continue;
                    }
                    Session::Stale | Session::ManualReconnect => {
                        status.send_modify(|s| s.state = ConnectionState::Disconnected);
                        match wait_or_ctrl(&mut ctrl, RECONNECT_DELAY).await {
                            Wait::Disconnect => break,
                            _ => continue,
                        }
                    }
                    Session::TransportLost(reason) => {
                        tracing::warn!(%reason, "push channel lost");
                        status.send_modify(|s| s.last_error = Some(reason));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "push channel failed to open");
                status.send_modify(|s| s.last_error = Some(e.to_string()));
            }
        }

        // Bounded exponential backoff; after the ceiling, stay down until a
        // manual reconnect arrives.
        if attempt >= reconnect.max_attempts {
            let reason = format!(
                "gave up after {} reconnect attempts",
                reconnect.max_attempts
            );
            tracing::error!("{reason}");
            status.send_modify(|s| s.state = ConnectionState::Failed { reason });

            loop {
                match ctrl.recv().await {
                    Some(Control::Reconnect) => {
                        attempt = 0;
                        continue 'outer;
                    }
                    Some(Control::Disconnect) | None => break 'outer,
                }
            }
        }

        let delay = reconnect.delay_for_attempt(attempt);
        attempt += 1;
        tracing::info!(delay_ms = delay.as_millis() as u64, attempt, "scheduling reconnect");
        status.send_modify(|s| s.state = ConnectionState::Reconnecting { attempt });

        match wait_or_ctrl(&mut ctrl, delay).await {
            Wait::Elapsed => {}
            Wait::Reconnect => attempt = 0,
            Wait::Disconnect => break,
        }
    }

    // Back to the initial shape; counter and timers are gone with the task.
    status.send_modify(|s| *s = ConnectionStatus::default());
    tracing::debug!("push connection task ended");
}

/// Pump one live connection: parse frames, refresh heartbeats, run the
/// watchdog. The watchdog interval lives here, so leaving `Connected` always
/// tears it down with the stream. Each watchdog tick also re-checks the
/// session accessor, so losing the identity mid-session closes the channel
/// instead of riding it until the server hangs up.
async fn drive_connected(
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url_builder: &(dyn Fn() -> Option<String> + Send + Sync),
    dispatcher: &Dispatcher,
    heartbeat: &HeartbeatConfig,
    status: &watch::Sender<ConnectionStatus>,
    ctrl: &mut mpsc::UnboundedReceiver<Control>,
) -> Session {
    let mut last_beat = Instant::now();
    let mut watchdog = tokio::time::interval_at(
        Instant::now() + heartbeat.check_interval,
        heartbeat.check_interval,
    );

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<PushEvent>(&text) {
                        Ok(PushEvent::Heartbeat { .. }) => {
                            last_beat = Instant::now();
                            status.send_modify(|s| s.last_heartbeat = Some(Utc::now()));
                        }
                        Ok(event) => dispatcher.dispatch(event),
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed push payload");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    return Session::TransportLost("server closed the channel".into());
                }
                Some(Ok(_)) => {} // binary, ping, pong
                Some(Err(e)) => return Session::TransportLost(e.to_string()),
                None => return Session::TransportLost("push channel ended".into()),
            },
            _ = watchdog.tick() => {
                if url_builder().is_none() {
                    tracing::info!("identity lost, closing push channel");
                    let _ = stream.close(None).await;
                    return Session::IdentityLost;
                }
                if last_beat.elapsed() > heartbeat.stale_after {
                    tracing::warn!(
                        stale_after_secs = heartbeat.stale_after.as_secs(),
                        "no heartbeat, presuming channel silently dead"
                    );
                    return Session::Stale;
                }
            }
            msg = ctrl.recv() => match msg {
                Some(Control::Reconnect) => return Session::ManualReconnect,
                Some(Control::Disconnect) | None => {
                    let _ = stream.close(None).await;
                    return Session::Disconnect;
                }
            }
        }
    }
}

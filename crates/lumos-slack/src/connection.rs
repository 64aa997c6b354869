//! One physical Socket Mode connection: receive loop, acknowledgments, dispatch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::socket_envelope::{
    decode_socket_envelope, Acknowledgment, EventsApiEnvelope, InteractiveEnvelope, SocketFrame,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Draining,
}

/// Receives decoded payloads after they have been acknowledged.
///
/// Each call runs on its own task; implementations must tolerate concurrent calls.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync + 'static {
    async fn handle_events_api(&self, envelope: EventsApiEnvelope);

    async fn handle_interactive(&self, envelope: InteractiveEnvelope);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Server asked us to go away.
    Disconnect(String),
    Shutdown,
    /// Stream ended or a close frame arrived.
    StreamClosed,
    TransportError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub acknowledged: usize,
    pub dispatched: usize,
    pub dropped_frames: usize,
    pub unknown_frames: usize,
    pub abandoned_tasks: usize,
    pub close_reason: CloseReason,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            acknowledged: 0,
            dispatched: 0,
            dropped_frames: 0,
            unknown_frames: 0,
            abandoned_tasks: 0,
            close_reason: CloseReason::StreamClosed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Upper bound on the websocket upgrade; a peer that never answers fails the session.
    pub connect_timeout: Duration,
    /// Upper bound on waiting for in-flight dispatches once the session stops reading.
    pub drain_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

enum FrameOutcome {
    Continue,
    Stop(CloseReason),
}

/// Single-use manager for one socket session. Reconnecting means building a new one.
pub struct ConnectionManager<H> {
    handler: Arc<H>,
    config: ConnectionConfig,
    state: watch::Sender<ConnectionState>,
}

impl<H: EnvelopeHandler> ConnectionManager<H> {
    pub fn new(handler: Arc<H>, config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            handler,
            config,
            state,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(?previous, ?next, "socket connection state changed");
        }
    }

    /// Connects to `socket_url` and serves frames until disconnect, shutdown,
    /// or a transport fault. Only a failed handshake is returned as an error.
    pub async fn run(
        self,
        socket_url: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SessionReport> {
        self.transition(ConnectionState::Connecting);
        let connect = tokio::time::timeout(self.config.connect_timeout, connect_async(socket_url));
        let handshake = tokio::select! {
            handshake = connect => handshake,
            _ = wait_for_shutdown(&mut shutdown) => {
                self.transition(ConnectionState::Disconnected);
                tracing::info!("slack socket shutdown requested during handshake");
                let mut report = SessionReport::new();
                report.close_reason = CloseReason::Shutdown;
                return Ok(report);
            }
        };
        let (stream, _response) = match handshake {
            Ok(Ok(connected)) => connected,
            Ok(Err(error)) => {
                self.transition(ConnectionState::Disconnected);
                return Err(error).context("failed to connect slack socket mode websocket");
            }
            Err(_) => {
                self.transition(ConnectionState::Disconnected);
                return Err(anyhow!(
                    "websocket handshake timed out after {} ms",
                    self.config.connect_timeout.as_millis()
                ))
                .context("failed to connect slack socket mode websocket");
            }
        };
        let (mut sink, mut source) = stream.split();
        let mut in_flight = JoinSet::new();
        let mut report = SessionReport::new();

        let close_reason = loop {
            if *shutdown.borrow() {
                break CloseReason::Shutdown;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break CloseReason::Shutdown;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_dispatch_result(joined);
                }
                maybe_message = source.next() => {
                    let message = match maybe_message {
                        None => break CloseReason::StreamClosed,
                        Some(Ok(message)) => message,
                        Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                            break CloseReason::StreamClosed;
                        }
                        Some(Err(error)) => {
                            tracing::warn!(%error, "slack socket read failed; treating as disconnect");
                            break CloseReason::TransportError(error.to_string());
                        }
                    };
                    match self
                        .handle_message(message, &mut sink, &mut in_flight, &mut report)
                        .await
                    {
                        FrameOutcome::Continue => {}
                        FrameOutcome::Stop(reason) => break reason,
                    }
                }
            }
        };

        self.transition(ConnectionState::Draining);
        if let Err(error) = sink.close().await {
            tracing::debug!(%error, "slack socket close handshake failed");
        }
        report.abandoned_tasks = self.drain(&mut in_flight).await;
        report.close_reason = close_reason;
        self.transition(ConnectionState::Disconnected);
        tracing::info!(
            acknowledged = report.acknowledged,
            dispatched = report.dispatched,
            dropped_frames = report.dropped_frames,
            close_reason = ?report.close_reason,
            "slack socket session ended"
        );
        Ok(report)
    }

    async fn handle_message<S>(
        &self,
        message: WsMessage,
        sink: &mut S,
        in_flight: &mut JoinSet<()>,
        report: &mut SessionReport,
    ) -> FrameOutcome
    where
        S: Sink<WsMessage> + Unpin,
        S::Error: std::fmt::Display,
    {
        let text = match message {
            WsMessage::Text(text) => text.as_str().to_string(),
            WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(%error, "dropping non utf-8 slack socket frame");
                    report.dropped_frames += 1;
                    return FrameOutcome::Continue;
                }
            },
            WsMessage::Close(frame) => {
                if let Some(frame) = frame {
                    tracing::info!(code = %frame.code, reason = %frame.reason.as_str(), "slack socket closed by peer");
                }
                return FrameOutcome::Stop(CloseReason::StreamClosed);
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {
                return FrameOutcome::Continue;
            }
        };

        let envelope = match decode_socket_envelope(&text) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(%error, "dropping undecodable slack socket frame");
                report.dropped_frames += 1;
                return FrameOutcome::Continue;
            }
        };

        let Some(frame) = envelope.frame else {
            tracing::warn!(kind = %envelope.kind, raw = %envelope.raw, "ignoring unknown slack socket frame");
            report.unknown_frames += 1;
            return FrameOutcome::Continue;
        };

        match frame {
            SocketFrame::Hello(hello) => {
                tracing::info!(
                    app_id = %hello.connection_info.app_id,
                    connections = hello.connection_count,
                    "slack socket connected"
                );
                self.transition(ConnectionState::Connected);
                FrameOutcome::Continue
            }
            SocketFrame::Disconnect(disconnect) => {
                tracing::info!(reason = %disconnect.reason, "slack requested socket disconnect");
                FrameOutcome::Stop(CloseReason::Disconnect(disconnect.reason))
            }
            SocketFrame::EventsApi(envelope) => {
                let envelope_id = envelope.envelope_id.clone();
                let handler = Arc::clone(&self.handler);
                self.acknowledge_and_dispatch(&envelope_id, sink, in_flight, report, async move {
                    handler.handle_events_api(envelope).await;
                })
                .await
            }
            SocketFrame::Interactive(envelope) => {
                let envelope_id = envelope.envelope_id.clone();
                let handler = Arc::clone(&self.handler);
                self.acknowledge_and_dispatch(&envelope_id, sink, in_flight, report, async move {
                    handler.handle_interactive(envelope).await;
                })
                .await
            }
        }
    }

    async fn acknowledge_and_dispatch<S, F>(
        &self,
        envelope_id: &str,
        sink: &mut S,
        in_flight: &mut JoinSet<()>,
        report: &mut SessionReport,
        dispatch: F,
    ) -> FrameOutcome
    where
        S: Sink<WsMessage> + Unpin,
        S::Error: std::fmt::Display,
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.state() != ConnectionState::Connected {
            tracing::warn!(envelope_id, "dropping slack envelope received before hello");
            report.dropped_frames += 1;
            return FrameOutcome::Continue;
        }

        let ack = Acknowledgment::new(envelope_id).to_text();
        if let Err(error) = sink.send(WsMessage::Text(ack.into())).await {
            tracing::warn!(envelope_id, %error, "failed to send slack socket ack");
            return FrameOutcome::Stop(CloseReason::TransportError(error.to_string()));
        }
        report.acknowledged += 1;
        tracing::debug!(envelope_id, "acknowledged slack envelope");

        in_flight.spawn(dispatch);
        report.dispatched += 1;
        FrameOutcome::Continue
    }

    async fn drain(&self, in_flight: &mut JoinSet<()>) -> usize {
        if in_flight.is_empty() {
            return 0;
        }
        let drained = tokio::time::timeout(self.config.drain_timeout, async {
            while let Some(joined) = in_flight.join_next().await {
                log_dispatch_result(joined);
            }
        })
        .await;
        if drained.is_ok() {
            return 0;
        }
        let abandoned = in_flight.len();
        tracing::warn!(
            abandoned,
            drain_timeout_ms = self.config.drain_timeout.as_millis() as u64,
            "detaching in-flight slack dispatches after drain timeout"
        );
        in_flight.detach_all();
        abandoned
    }
}

/// Resolves once shutdown is requested or the shutdown sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|requested| *requested).await;
}

fn log_dispatch_result(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(error) = joined {
        if error.is_panic() {
            tracing::error!(%error, "slack dispatch task panicked");
        } else {
            tracing::debug!(%error, "slack dispatch task cancelled");
        }
    }
}

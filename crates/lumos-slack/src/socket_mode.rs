//! Long-running Socket Mode client that keeps a connection open across disconnects.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;

use crate::api_client::SlackApiClient;
use crate::connection::{CloseReason, ConnectionConfig, ConnectionManager, EnvelopeHandler};
use crate::slack_helpers::reconnect_delay;

#[derive(Debug, Clone, Copy)]
pub struct SocketModeConfig {
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub drain_timeout: Duration,
}

impl Default for SocketModeConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketModeSummary {
    pub sessions: usize,
    pub acknowledged: usize,
    pub failure_streak: usize,
}

pub struct SocketModeRunner<H> {
    slack: SlackApiClient,
    handler: Arc<H>,
    config: SocketModeConfig,
}

impl<H: EnvelopeHandler> SocketModeRunner<H> {
    pub fn new(slack: SlackApiClient, handler: Arc<H>, config: SocketModeConfig) -> Self {
        Self {
            slack,
            handler,
            config,
        }
    }

    /// Opens a fresh session URL for every connection until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<SocketModeSummary> {
        let mut summary = SocketModeSummary::default();
        loop {
            if *shutdown.borrow() {
                tracing::info!("slack socket mode shutdown requested");
                return Ok(summary);
            }

            match self.run_session(shutdown.clone()).await {
                Ok(report) => {
                    summary.sessions += 1;
                    summary.acknowledged += report.acknowledged;
                    match report.close_reason {
                        CloseReason::Shutdown => {
                            tracing::info!("slack socket mode shutdown requested");
                            return Ok(summary);
                        }
                        CloseReason::TransportError(_) => {
                            summary.failure_streak = summary.failure_streak.saturating_add(1);
                        }
                        CloseReason::Disconnect(_) | CloseReason::StreamClosed => {
                            summary.failure_streak = 0;
                        }
                    }
                }
                Err(error) => {
                    summary.failure_streak = summary.failure_streak.saturating_add(1);
                    tracing::warn!(
                        error = %format!("{error:#}"),
                        failure_streak = summary.failure_streak,
                        "slack socket session failed"
                    );
                }
            }

            let delay = reconnect_delay(
                self.config.reconnect_delay,
                summary.failure_streak,
                self.config.max_reconnect_delay,
            );
            if wait_or_shutdown(delay, &mut shutdown).await {
                tracing::info!("slack socket mode shutdown requested");
                return Ok(summary);
            }
        }
    }

    async fn run_session(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<crate::connection::SessionReport> {
        let socket_url = self.slack.open_socket_connection().await?;
        let manager = ConnectionManager::new(
            Arc::clone(&self.handler),
            ConnectionConfig {
                connect_timeout: self.config.connect_timeout,
                drain_timeout: self.config.drain_timeout,
            },
        );
        manager.run(&socket_url, shutdown).await
    }
}

/// Sleeps for `delay`; returns true when shutdown was requested meanwhile.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use httpmock::prelude::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::sync::watch;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use super::{SocketModeConfig, SocketModeRunner};
    use crate::api_client::{SlackApiClient, SlackApiConfig};
    use crate::connection::EnvelopeHandler;
    use crate::socket_envelope::{EventsApiEnvelope, InteractiveEnvelope};

    struct NoopHandler;

    #[async_trait]
    impl EnvelopeHandler for NoopHandler {
        async fn handle_events_api(&self, _envelope: EventsApiEnvelope) {}

        async fn handle_interactive(&self, _envelope: InteractiveEnvelope) {}
    }

    fn test_config() -> SocketModeConfig {
        SocketModeConfig {
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_delay: Duration::from_millis(50),
            connect_timeout: Duration::from_secs(2),
            drain_timeout: Duration::from_secs(1),
        }
    }

    fn slack_client(api_base: String) -> SlackApiClient {
        SlackApiClient::new(SlackApiConfig {
            api_base,
            app_token: "xapp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            request_timeout_ms: 2_000,
            retry_max_attempts: 1,
            retry_base_delay_ms: 1,
        })
        .expect("slack client")
    }

    #[tokio::test]
    async fn integration_runner_reconnects_with_fresh_url_after_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let Ok(mut socket) = accept_async(stream).await else {
                        return;
                    };
                    let _ = socket
                        .send(WsMessage::Text(
                            r#"{"type":"hello","num_connections":1}"#.into(),
                        ))
                        .await;
                    let _ = socket
                        .send(WsMessage::Text(
                            r#"{"type":"disconnect","reason":"refresh_requested"}"#.into(),
                        ))
                        .await;
                    while let Some(Ok(_)) = socket.next().await {}
                });
            }
        });

        let server = MockServer::start();
        let open = server.mock(|when, then| {
            when.method(POST).path("/apps.connections.open");
            then.status(200)
                .json_body(json!({"ok": true, "url": format!("ws://{addr}")}));
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = SocketModeRunner::new(
            slack_client(server.base_url()),
            Arc::new(NoopHandler),
            test_config(),
        );
        let running = tokio::spawn(runner.run(shutdown_rx));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while open.calls() < 2 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "runner did not reconnect"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(true).expect("shutdown");

        let summary = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("runner stops")
            .expect("join")
            .expect("runner");
        assert!(summary.sessions >= 1);
        assert_eq!(summary.failure_streak, 0);
    }

    #[tokio::test]
    async fn regression_runner_counts_failed_url_requests_and_honors_shutdown() {
        let server = MockServer::start();
        let open = server.mock(|when, then| {
            when.method(POST).path("/apps.connections.open");
            then.status(200)
                .json_body(json!({"ok": false, "error": "invalid_auth"}));
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = SocketModeRunner::new(
            slack_client(server.base_url()),
            Arc::new(NoopHandler),
            test_config(),
        );
        let running = tokio::spawn(runner.run(shutdown_rx));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while open.calls() < 3 {
            assert!(tokio::time::Instant::now() < deadline, "runner stalled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(true).expect("shutdown");

        let summary = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("runner stops")
            .expect("join")
            .expect("runner");
        assert_eq!(summary.sessions, 0);
        assert!(summary.failure_streak >= 3);
    }

    #[tokio::test]
    async fn regression_runner_counts_streams_dropped_without_close_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut socket) = accept_async(stream).await else {
                        return;
                    };
                    let _ = socket
                        .send(WsMessage::Text(
                            r#"{"type":"hello","num_connections":1}"#.into(),
                        ))
                        .await;
                    drop(socket);
                });
            }
        });

        let server = MockServer::start();
        let open = server.mock(|when, then| {
            when.method(POST).path("/apps.connections.open");
            then.status(200)
                .json_body(json!({"ok": true, "url": format!("ws://{addr}")}));
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = SocketModeRunner::new(
            slack_client(server.base_url()),
            Arc::new(NoopHandler),
            test_config(),
        );
        let running = tokio::spawn(runner.run(shutdown_rx));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while open.calls() < 2 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "runner did not reconnect"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(true).expect("shutdown");

        let summary = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("runner stops")
            .expect("join")
            .expect("runner");
        assert!(summary.sessions >= 1);
        assert!(summary.failure_streak >= 1);
    }
}

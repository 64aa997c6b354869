use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use httpmock::prelude::*;
use httpmock::Mock;
use lumos_bot::{run_bot, BotConfig, FeedbackRecord};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const HELLO: &str = r#"{"type":"hello","num_connections":1,"connection_info":{"app_id":"A1"}}"#;

fn bot_config(api_base: &str, feedback_log: &Path) -> BotConfig {
    BotConfig {
        slack_app_token: "xapp-test".to_string(),
        slack_bot_token: "xoxb-test".to_string(),
        slack_api_base: api_base.to_string(),
        chat_api_url: format!("{api_base}/v1"),
        chat_api_key: "sk-test".to_string(),
        chat_model: "gpt-test".to_string(),
        chat_top_p: 0.8,
        retrieval_api_url: api_base.to_string(),
        retrieval_limit: 3,
        feedback_log: feedback_log.to_path_buf(),
        feedback_buttons: true,
        request_timeout_ms: 5_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
        reconnect_delay_ms: 50,
        max_reconnect_delay_ms: 200,
        drain_timeout_ms: 2_000,
    }
}

fn question_frame() -> String {
    json!({
        "type": "events_api",
        "envelope_id": "env-question",
        "accepts_response_payload": false,
        "retry_attempt": 0,
        "retry_reason": "",
        "payload": {
            "type": "event_callback",
            "event_id": "Ev1",
            "team_id": "T1",
            "event": {
                "type": "message",
                "channel": "D1",
                "user": "U1",
                "parent_user_id": "U2",
                "text": "where is the doc?",
                "ts": "2.0",
                "thread_ts": "1.0",
                "channel_type": "im"
            }
        }
    })
    .to_string()
}

fn bot_echo_frame() -> String {
    json!({
        "type": "events_api",
        "envelope_id": "env-bot-echo",
        "payload": {
            "type": "event_callback",
            "event": {
                "type": "message",
                "channel": "D1",
                "user": "U9",
                "bot_id": "B1",
                "text": "The doc is in the wiki.",
                "ts": "3.0",
                "thread_ts": "1.0"
            }
        }
    })
    .to_string()
}

fn feedback_frame(response_url: &str) -> String {
    json!({
        "type": "interactive",
        "envelope_id": "env-feedback",
        "accepts_response_payload": false,
        "payload": {
            "type": "block_actions",
            "user": {"id": "U1", "team_id": "T1"},
            "team": {"id": "T1", "domain": "acme"},
            "channel": {"id": "D1"},
            "trigger_id": "trig-1",
            "response_url": response_url,
            "container": {"thread_ts": "", "message_ts": "1.0"},
            "message": {"ts": "3.0"},
            "actions": [{
                "type": "button",
                "action_id": "feedback_good",
                "block_id": "actionblock789",
                "value": "feedback_good"
            }]
        }
    })
    .to_string()
}

/// Serves a single socket session: hello, the given frames, then collects
/// every text frame the client sends until it closes.
async fn serve_session(listener: TcpListener, frames: Vec<String>) -> Vec<Value> {
    let (stream, _) = listener.accept().await.expect("accept socket client");
    let mut socket = accept_async(stream).await.expect("websocket handshake");
    socket
        .send(WsMessage::Text(HELLO.to_string().into()))
        .await
        .expect("send hello");
    for frame in frames {
        socket
            .send(WsMessage::Text(frame.into()))
            .await
            .expect("send frame");
    }

    let mut received = Vec::new();
    while let Some(Ok(message)) = socket.next().await {
        if let WsMessage::Text(text) = message {
            received.push(serde_json::from_str(text.as_str()).expect("client frame is json"));
        }
    }
    received
}

async fn wait_for_calls(mock: &Mock<'_>, expected: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while mock.calls_async().await < expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("mock was not called in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn integration_socket_mode_question_is_acked_answered_and_rated() {
    let server = MockServer::start_async().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind socket");
    let socket_url = format!("ws://{}", listener.local_addr().expect("socket addr"));

    server.mock(|when, then| {
        when.method(POST).path("/auth.test");
        then.status(200)
            .json_body(json!({"ok": true, "user_id": "UBOT"}));
    });
    let open = server.mock(|when, then| {
        when.method(POST)
            .path("/apps.connections.open")
            .header("authorization", "Bearer xapp-test");
        then.status(200)
            .json_body(json!({"ok": true, "url": socket_url}));
    });
    let status = server.mock(|when, then| {
        when.method(POST)
            .path("/assistant.threads.setStatus")
            .header("authorization", "Bearer xoxb-test");
        then.status(200).json_body(json!({"ok": true}));
    });
    let retrieval = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/passages/search")
            .json_body(json!({"query": "where is the doc?", "limit": 3}));
        then.status(200).json_body(json!({
            "passages": [{"id": "p1", "content": "Docs live in the team wiki.", "score": 0.92}]
        }));
    });
    let generation = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test");
        then.status(200).json_body(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "The doc is in the wiki."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
        }));
    });
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .header("authorization", "Bearer xoxb-test");
        then.status(200)
            .json_body(json!({"ok": true, "channel": "D1", "ts": "3.0"}));
    });
    let thanks = server.mock(|when, then| {
        when.method(POST).path("/actions/feedback").json_body(json!({
            "response_type": "ephemeral",
            "text": "Thanks for your feedback!",
            "thread_ts": "1.0",
            "delete_original": false,
            "replace_original": false
        }));
        then.status(200).body("ok");
    });

    let frames = vec![
        question_frame(),
        bot_echo_frame(),
        feedback_frame(&server.url("/actions/feedback")),
    ];
    let session = tokio::spawn(serve_session(listener, frames));

    let dir = tempfile::tempdir().expect("tempdir");
    let feedback_log = dir.path().join("feedback.jsonl");
    let config = bot_config(&server.base_url(), &feedback_log);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bot = tokio::spawn(async move { run_bot(&config, shutdown_rx).await });

    wait_for_calls(&post, 1).await;
    wait_for_calls(&thanks, 1).await;
    shutdown_tx.send(true).expect("request shutdown");

    let summary = tokio::time::timeout(Duration::from_secs(10), bot)
        .await
        .expect("bot stops after shutdown")
        .expect("bot task")
        .expect("bot run");
    let acks = tokio::time::timeout(Duration::from_secs(10), session)
        .await
        .expect("session ends")
        .expect("session task");

    assert_eq!(summary.sessions, 1);
    assert_eq!(summary.acknowledged, 3);
    let mut acked_ids = acks
        .iter()
        .map(|ack| ack["envelope_id"].as_str().expect("envelope_id").to_string())
        .collect::<Vec<_>>();
    acked_ids.sort();
    assert_eq!(acked_ids, vec!["env-bot-echo", "env-feedback", "env-question"]);

    assert_eq!(open.calls_async().await, 1);
    assert_eq!(status.calls_async().await, 2);
    assert_eq!(retrieval.calls_async().await, 1);
    assert_eq!(generation.calls_async().await, 1);
    assert_eq!(post.calls_async().await, 1);

    let raw = std::fs::read_to_string(&feedback_log).expect("read feedback log");
    let records = raw
        .lines()
        .map(|line| serde_json::from_str::<FeedbackRecord>(line).expect("feedback record"))
        .collect::<Vec<_>>();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action_id, "feedback_good");
    assert_eq!(records[0].thread_ts.as_deref(), Some("1.0"));
    assert_eq!(records[0].channel.as_deref(), Some("D1"));
}

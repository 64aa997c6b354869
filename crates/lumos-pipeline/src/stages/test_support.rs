use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use lumos_ai::{ChatRequest, ChatResponse, ChatUsage, LlmClient, LumosAiError, Message};
use lumos_slack::interactive::ResponsePayload;
use lumos_slack::{PostMessageRequest, SlackMessenger, SlackPostedMessage};

use crate::retrieval::{Passage, PassageRetriever};

pub(crate) type StatusCall = (String, Option<String>, String);

#[derive(Default)]
pub(crate) struct RecordingMessenger {
    posts: Mutex<Vec<PostMessageRequest>>,
    statuses: Mutex<Vec<StatusCall>>,
    fail_status: bool,
    fail_post: bool,
}

impl RecordingMessenger {
    pub(crate) fn failing_status() -> Self {
        Self {
            fail_status: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_post() -> Self {
        Self {
            fail_post: true,
            ..Self::default()
        }
    }

    pub(crate) fn posts(&self) -> Vec<PostMessageRequest> {
        self.posts.lock().expect("posts lock").clone()
    }

    pub(crate) fn statuses(&self) -> Vec<StatusCall> {
        self.statuses.lock().expect("statuses lock").clone()
    }
}

#[async_trait]
impl SlackMessenger for RecordingMessenger {
    async fn post_message(&self, request: &PostMessageRequest) -> Result<SlackPostedMessage> {
        self.posts.lock().expect("posts lock").push(request.clone());
        if self.fail_post {
            bail!("slack chat.postMessage failed: channel_not_found");
        }
        Ok(SlackPostedMessage {
            channel: request.channel.clone(),
            ts: "9.9".to_string(),
        })
    }

    async fn set_assistant_status(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        status: &str,
    ) -> Result<()> {
        self.statuses.lock().expect("statuses lock").push((
            channel.to_string(),
            thread_ts.map(str::to_string),
            status.to_string(),
        ));
        if self.fail_status {
            bail!("slack assistant.threads.setStatus failed: not_allowed");
        }
        Ok(())
    }

    async fn respond(&self, _response_url: &str, _payload: &ResponsePayload) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct StaticGenerator {
    reply: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StaticGenerator {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for StaticGenerator {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LumosAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        Ok(ChatResponse {
            message: Message::assistant_text(self.reply.clone()),
            finish_reason: Some("stop".to_string()),
            usage: ChatUsage::default(),
        })
    }
}

pub(crate) struct FailingGenerator;

#[async_trait]
impl LlmClient for FailingGenerator {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, LumosAiError> {
        Err(LumosAiError::HttpStatus {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

pub(crate) struct StaticRetriever {
    passages: Vec<Passage>,
    fail: bool,
}

impl StaticRetriever {
    pub(crate) fn with_passages(contents: &[&str]) -> Self {
        Self {
            passages: contents
                .iter()
                .enumerate()
                .map(|(index, content)| Passage {
                    id: format!("p{index}"),
                    content: content.to_string(),
                    score: 1.0,
                })
                .collect(),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            passages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PassageRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<Passage>> {
        if self.fail {
            bail!("passage search failed with status 500: index offline");
        }
        Ok(self.passages.iter().take(limit).cloned().collect())
    }
}

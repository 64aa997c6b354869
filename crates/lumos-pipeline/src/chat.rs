use std::fmt;
use std::sync::Arc;

use lumos_ai::LlmClient;
use lumos_slack::SlackMessenger;

use crate::retrieval::Passage;

/// Cross-stage slots attached to a [`Chat`].
#[derive(Default)]
pub struct ChatContext {
    messenger: Option<Arc<dyn SlackMessenger>>,
    generator: Option<Arc<dyn LlmClient>>,
    passages: Vec<Passage>,
    response: Option<String>,
}

impl ChatContext {
    pub fn messenger(&self) -> Option<&Arc<dyn SlackMessenger>> {
        self.messenger.as_ref()
    }

    pub fn set_messenger(&mut self, messenger: Arc<dyn SlackMessenger>) {
        self.messenger = Some(messenger);
    }

    pub fn generator(&self) -> Option<&Arc<dyn LlmClient>> {
        self.generator.as_ref()
    }

    pub fn set_generator(&mut self, generator: Arc<dyn LlmClient>) {
        self.generator = Some(generator);
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn set_passages(&mut self, passages: Vec<Passage>) {
        self.passages = passages;
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn set_response(&mut self, response: impl Into<String>) {
        self.response = Some(response.into());
    }
}

impl fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatContext")
            .field("has_messenger", &self.messenger.is_some())
            .field("has_generator", &self.generator.is_some())
            .field("passages", &self.passages.len())
            .field("response", &self.response)
            .finish()
    }
}

/// Unit of work for one pipeline invocation.
///
/// Channel, thread and messages are fixed at construction; stages only extend
/// the side-channel through [`Chat::context_mut`].
#[derive(Debug)]
pub struct Chat {
    channel: String,
    thread_ts: String,
    messages: Vec<String>,
    context: ChatContext,
}

impl Chat {
    pub fn new(
        channel: impl Into<String>,
        thread_ts: impl Into<String>,
        messages: Vec<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: thread_ts.into(),
            messages,
            context: ChatContext::default(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn thread_ts(&self) -> &str {
        &self.thread_ts
    }

    /// Thread timestamp, or `None` for top-level conversations.
    pub fn thread(&self) -> Option<&str> {
        Some(self.thread_ts.as_str()).filter(|ts| !ts.trim().is_empty())
    }

    /// Messages in the conversation, most recent last.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Most recent non-blank message.
    pub fn query(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .map(|message| message.trim())
            .find(|message| !message.is_empty())
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ChatContext {
        &mut self.context
    }
}

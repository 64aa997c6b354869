//! Events API payloads carried inside `events_api` socket frames.

use serde::Deserialize;

use crate::discriminated::{decode_variant, Tagged, TaggedUnion, VariantDecoder};

pub const EVENTS_API_EVENT_CALLBACK: &str = "event_callback";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_ASSISTANT_THREAD_STARTED: &str = "assistant_thread_started";
pub const EVENT_ASSISTANT_THREAD_CONTEXT_CHANGED: &str = "assistant_thread_context_changed";
pub const MESSAGE_SUBTYPE_BOT: &str = "bot_message";

/// `payload` of an `events_api` frame.
pub type EventsApiPayload = Tagged<EventsApiVariant>;

#[derive(Debug, Clone, PartialEq)]
pub enum EventsApiVariant {
    EventCallback(EventCallback),
}

impl From<EventCallback> for EventsApiVariant {
    fn from(value: EventCallback) -> Self {
        Self::EventCallback(value)
    }
}

impl TaggedUnion for EventsApiVariant {
    const NAME: &'static str = "events api payload";
    const VARIANTS: &'static [(&'static str, VariantDecoder<Self>)] = &[(
        EVENTS_API_EVENT_CALLBACK,
        decode_variant::<EventCallback, EventsApiVariant>,
    )];
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventCallback {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub event_time: u64,
    pub event: Tagged<DomainEvent>,
}

impl EventsApiPayload {
    /// Inner domain event of an `event_callback` payload.
    pub fn domain_event(&self) -> Option<&Tagged<DomainEvent>> {
        match self.variant.as_ref()? {
            EventsApiVariant::EventCallback(callback) => Some(&callback.event),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Externally delivered domain events this bot reacts to.
pub enum DomainEvent {
    Message(MessageEvent),
    AssistantThreadStarted(AssistantThreadEvent),
    AssistantThreadContextChanged(AssistantThreadEvent),
}

impl From<MessageEvent> for DomainEvent {
    fn from(value: MessageEvent) -> Self {
        Self::Message(value)
    }
}

fn decode_thread_started(value: &serde_json::Value) -> serde_json::Result<DomainEvent> {
    AssistantThreadEvent::deserialize(value).map(DomainEvent::AssistantThreadStarted)
}

fn decode_thread_context_changed(value: &serde_json::Value) -> serde_json::Result<DomainEvent> {
    AssistantThreadEvent::deserialize(value).map(DomainEvent::AssistantThreadContextChanged)
}

impl TaggedUnion for DomainEvent {
    const NAME: &'static str = "event";
    const VARIANTS: &'static [(&'static str, VariantDecoder<Self>)] = &[
        (EVENT_MESSAGE, decode_variant::<MessageEvent, DomainEvent>),
        (EVENT_ASSISTANT_THREAD_STARTED, decode_thread_started),
        (
            EVENT_ASSISTANT_THREAD_CONTEXT_CHANGED,
            decode_thread_context_changed,
        ),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub parent_user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub event_ts: String,
    #[serde(default)]
    pub thread_ts: String,
    #[serde(default)]
    pub channel_type: String,
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which signal marked a message as bot-authored.
pub enum BotSignal {
    BotId,
    BotSubtype,
    UsernameWithoutUser,
    KnownBotUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorship {
    Human,
    /// Author is the thread's parent author, i.e. the assistant thread owner replying to itself.
    ThreadParent,
    Bot(BotSignal),
}

impl Authorship {
    pub fn is_human(self) -> bool {
        matches!(self, Self::Human)
    }
}

impl MessageEvent {
    /// Classifies who wrote this message.
    ///
    /// Checked in order: parent-author equality, `bot_id`, `bot_message`
    /// subtype, a username with no user id, then the configured bot user id.
    pub fn classify_author(&self, known_bot_user_id: Option<&str>) -> Authorship {
        if self.user == self.parent_user_id {
            return Authorship::ThreadParent;
        }
        if !self.bot_id.trim().is_empty() {
            return Authorship::Bot(BotSignal::BotId);
        }
        if self.subtype == MESSAGE_SUBTYPE_BOT {
            return Authorship::Bot(BotSignal::BotSubtype);
        }
        if self.user.trim().is_empty() && !self.username.trim().is_empty() {
            return Authorship::Bot(BotSignal::UsernameWithoutUser);
        }
        if known_bot_user_id
            .map(str::trim)
            .is_some_and(|bot_user_id| !bot_user_id.is_empty() && bot_user_id == self.user)
        {
            return Authorship::Bot(BotSignal::KnownBotUser);
        }
        Authorship::Human
    }

    /// Timestamp replies should be threaded under.
    pub fn reply_thread_ts(&self) -> &str {
        if self.thread_ts.trim().is_empty() {
            self.ts.as_str()
        } else {
            self.thread_ts.as_str()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssistantThreadContext {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub enterprise_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssistantThread {
    #[serde(default)]
    pub context: AssistantThreadContext,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub thread_ts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Shared shape of `assistant_thread_started` and `assistant_thread_context_changed`.
pub struct AssistantThreadEvent {
    #[serde(default)]
    pub event_ts: String,
    #[serde(default)]
    pub assistant_thread: AssistantThread,
}

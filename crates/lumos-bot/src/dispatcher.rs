use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lumos_pipeline::{Chat, Pipeline};
use lumos_slack::events_api::{AssistantThreadEvent, DomainEvent, MessageEvent};
use lumos_slack::interactive::{BlockActionsPayload, InteractionVariant, ResponsePayload};
use lumos_slack::socket_envelope::{EventsApiEnvelope, InteractiveEnvelope};
use lumos_slack::{EnvelopeHandler, PostMessageRequest, SlackMessenger};

use crate::feedback::{feedback_records, FeedbackSink};

pub const GREETING_REPLY: &str = "Hello! How can I help you?";
pub const FEEDBACK_THANKS_REPLY: &str = "Thanks for your feedback!";

/// Routes decoded envelopes: messages into the pipeline, thread starts to a
/// greeting, feedback buttons to the feedback sink.
pub struct BotDispatcher {
    pipeline: Pipeline,
    messenger: Arc<dyn SlackMessenger>,
    feedback: Arc<dyn FeedbackSink>,
    bot_user_id: Option<String>,
}

impl BotDispatcher {
    pub fn new(
        pipeline: Pipeline,
        messenger: Arc<dyn SlackMessenger>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            pipeline,
            messenger,
            feedback,
            bot_user_id: None,
        }
    }

    pub fn with_bot_user_id(mut self, bot_user_id: Option<String>) -> Self {
        self.bot_user_id = bot_user_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Chat for a message event, or `None` when the event must not reach the pipeline.
    pub fn chat_for_message(&self, message: &MessageEvent) -> Option<Chat> {
        let authorship = message.classify_author(self.bot_user_id.as_deref());
        if !authorship.is_human() {
            tracing::debug!(
                channel = %message.channel,
                user = %message.user,
                authorship = ?authorship,
                "suppressed non-human message"
            );
            return None;
        }
        if message.channel.trim().is_empty() {
            tracing::warn!(ts = %message.ts, "message event without channel");
            return None;
        }
        Some(Chat::new(
            message.channel.as_str(),
            message.reply_thread_ts(),
            vec![message.text.clone()],
        ))
    }

    async fn handle_message(&self, message: &MessageEvent) {
        let Some(chat) = self.chat_for_message(message) else {
            return;
        };
        if let Err(error) = self.pipeline.run(chat).await {
            tracing::error!(
                channel = %message.channel,
                error = %format!("{error:#}"),
                "pipeline invocation failed"
            );
        }
    }

    async fn greet(&self, event: &AssistantThreadEvent) {
        let thread = &event.assistant_thread;
        let request = PostMessageRequest::new(thread.channel_id.as_str(), GREETING_REPLY)
            .in_thread(thread.thread_ts.as_str());
        if let Err(error) = self.messenger.post_message(&request).await {
            tracing::warn!(
                channel = %thread.channel_id,
                error = %format!("{error:#}"),
                "failed to post assistant greeting"
            );
        }
    }

    async fn handle_block_actions(&self, payload: &BlockActionsPayload) {
        let records = feedback_records(payload, Utc::now());
        if records.is_empty() {
            tracing::debug!(
                actions = payload.actions.len(),
                "ignored block actions without feedback buttons"
            );
            return;
        }
        for record in &records {
            if let Err(error) = self.feedback.record(record).await {
                tracing::error!(
                    user = %record.user,
                    action_id = %record.action_id,
                    error = %format!("{error:#}"),
                    "failed to record feedback"
                );
            }
        }
        if payload.response_url.trim().is_empty() {
            return;
        }
        let thanks = ResponsePayload::ephemeral(FEEDBACK_THANKS_REPLY)
            .in_thread(payload.resolve_thread_ts());
        if let Err(error) = self.messenger.respond(&payload.response_url, &thanks).await {
            tracing::warn!(
                user = %payload.user.id,
                error = %format!("{error:#}"),
                "failed to acknowledge feedback"
            );
        }
    }
}

#[async_trait]
impl EnvelopeHandler for BotDispatcher {
    async fn handle_events_api(&self, envelope: EventsApiEnvelope) {
        let Some(event) = envelope
            .payload
            .as_ref()
            .and_then(|payload| payload.domain_event())
        else {
            tracing::debug!(
                envelope_id = %envelope.envelope_id,
                "events_api envelope without domain event"
            );
            return;
        };
        match event.variant.as_ref() {
            Some(DomainEvent::Message(message)) => self.handle_message(message).await,
            Some(DomainEvent::AssistantThreadStarted(started)) => self.greet(started).await,
            Some(DomainEvent::AssistantThreadContextChanged(_)) => {}
            None => {
                tracing::debug!(
                    envelope_id = %envelope.envelope_id,
                    kind = %event.kind,
                    "ignored unknown domain event"
                );
            }
        }
    }

    async fn handle_interactive(&self, envelope: InteractiveEnvelope) {
        let Some(payload) = envelope.payload.as_ref() else {
            return;
        };
        match payload.variant.as_ref() {
            Some(InteractionVariant::BlockActions(actions)) => {
                self.handle_block_actions(actions).await
            }
            Some(
                InteractionVariant::MessageActions(_)
                | InteractionVariant::ViewClosed(_)
                | InteractionVariant::ViewSubmission(_),
            ) => {}
            None => {
                tracing::debug!(
                    envelope_id = %envelope.envelope_id,
                    kind = %payload.kind,
                    "ignored unknown interaction"
                );
            }
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use lumos_ai::{ChatRequest, Message};

use crate::chat::Chat;
use crate::retrieval::Passage;
use crate::stage::{Next, Stage};
use crate::stages::{GENERATION_FAILED_REPLY, NO_RELATED_INFO_REPLY, SERVICE_NOT_READY_REPLY};

const REFERENCE_HEADER: &str = "Reference material:";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-5".to_string(),
            top_p: Some(0.8),
            max_tokens: None,
        }
    }
}

/// Generates an answer from retrieved passages. Always sets a response, never stops the chain.
pub struct ResponseGeneration {
    settings: GenerationSettings,
}

impl ResponseGeneration {
    pub fn new(settings: GenerationSettings) -> Self {
        Self { settings }
    }

    fn build_request(&self, passages: &[Passage], query: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(passages.len() + 2);
        messages.push(Message::system(REFERENCE_HEADER));
        messages.extend(
            passages
                .iter()
                .map(|passage| Message::system(passage.content.clone())),
        );
        messages.push(Message::user(format!(
            "Answer the following question based on the reference material: {query}"
        )));
        ChatRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: None,
            top_p: self.settings.top_p,
        }
    }
}

#[async_trait]
impl Stage for ResponseGeneration {
    fn name(&self) -> &'static str {
        "response_generation"
    }

    async fn handle(&self, mut chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        if chat.context().passages().is_empty() {
            chat.context_mut().set_response(NO_RELATED_INFO_REPLY);
            return next.run(chat).await;
        }
        let Some(generator) = chat.context().generator().map(Arc::clone) else {
            tracing::warn!(channel = chat.channel(), "generation client is not configured");
            chat.context_mut().set_response(SERVICE_NOT_READY_REPLY);
            return next.run(chat).await;
        };
        let Some(query) = chat.query().map(str::to_string) else {
            chat.context_mut().set_response(GENERATION_FAILED_REPLY);
            return next.run(chat).await;
        };

        let request = self.build_request(chat.context().passages(), &query);
        let response = match generator.complete(request).await {
            Ok(response) => response.message.content,
            Err(error) => {
                tracing::error!(
                    channel = chat.channel(),
                    error = %error,
                    "failed to generate response"
                );
                GENERATION_FAILED_REPLY.to_string()
            }
        };
        chat.context_mut().set_response(response);
        next.run(chat).await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use lumos_slack::blockkit::{Block, ButtonElement, ButtonStyle, TextObject};
use lumos_slack::PostMessageRequest;

use crate::chat::Chat;
use crate::stage::{Next, PipelineError, Stage};
use crate::stages::EMPTY_RESPONSE_REPLY;

pub const FEEDBACK_BLOCK_ID: &str = "actionblock789";
pub const FEEDBACK_GOOD_ACTION: &str = "feedback_good";
pub const FEEDBACK_BAD_ACTION: &str = "feedback_bad";

/// Slack rejects section text longer than this.
const SECTION_TEXT_MAX_CHARS: usize = 3_000;

/// Reply rendered as markdown sections followed by good/bad feedback buttons.
pub fn feedback_blocks(text: &str) -> Vec<Block> {
    let mut blocks = split_chars(text, SECTION_TEXT_MAX_CHARS)
        .into_iter()
        .map(|chunk| Block::section(TextObject::markdown(chunk)))
        .collect::<Vec<_>>();
    blocks.push(Block::actions(
        FEEDBACK_BLOCK_ID,
        vec![
            ButtonElement::new("good", FEEDBACK_GOOD_ACTION)
                .with_value(FEEDBACK_GOOD_ACTION)
                .with_style(ButtonStyle::Primary),
            ButtonElement::new("bad", FEEDBACK_BAD_ACTION)
                .with_value(FEEDBACK_BAD_ACTION)
                .with_style(ButtonStyle::Danger),
        ],
    ));
    blocks
}

fn split_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars = text.chars().collect::<Vec<_>>();
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Posts the response into the conversation thread.
pub struct ChatResponse {
    feedback_buttons: bool,
}

impl ChatResponse {
    pub fn new(feedback_buttons: bool) -> Self {
        Self { feedback_buttons }
    }
}

#[async_trait]
impl Stage for ChatResponse {
    fn name(&self) -> &'static str {
        "chat_response"
    }

    async fn handle(&self, chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        let Some(messenger) = chat.context().messenger().map(Arc::clone) else {
            return Err(PipelineError::MissingMessenger { stage: self.name() }.into());
        };
        let response = chat
            .context()
            .response()
            .filter(|response| !response.trim().is_empty())
            .unwrap_or(EMPTY_RESPONSE_REPLY)
            .to_string();

        let mut request = PostMessageRequest::new(chat.channel(), response.as_str())
            .in_thread(chat.thread_ts());
        if self.feedback_buttons {
            request = request.with_blocks(feedback_blocks(&response));
        }
        match messenger.post_message(&request).await {
            Ok(posted) => {
                tracing::info!(
                    channel = %posted.channel,
                    ts = %posted.ts,
                    thread_ts = chat.thread_ts(),
                    "posted chat response"
                );
            }
            Err(error) => {
                tracing::error!(
                    channel = chat.channel(),
                    error = %format!("{error:#}"),
                    "failed to post chat response"
                );
            }
        }
        next.run(chat).await
    }
}

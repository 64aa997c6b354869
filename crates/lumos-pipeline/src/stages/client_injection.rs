use std::sync::Arc;

use async_trait::async_trait;
use lumos_ai::LlmClient;
use lumos_slack::SlackMessenger;

use crate::chat::Chat;
use crate::stage::{Next, Stage};

/// Places the shared Slack and generation clients into the chat context.
pub struct ClientInjection {
    messenger: Arc<dyn SlackMessenger>,
    generator: Option<Arc<dyn LlmClient>>,
}

impl ClientInjection {
    pub fn new(messenger: Arc<dyn SlackMessenger>, generator: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            messenger,
            generator,
        }
    }
}

#[async_trait]
impl Stage for ClientInjection {
    fn name(&self) -> &'static str {
        "client_injection"
    }

    async fn handle(&self, mut chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        let context = chat.context_mut();
        context.set_messenger(Arc::clone(&self.messenger));
        if let Some(generator) = &self.generator {
            context.set_generator(Arc::clone(generator));
        }
        next.run(chat).await
    }
}

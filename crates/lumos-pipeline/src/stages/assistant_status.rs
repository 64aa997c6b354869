use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::Chat;
use crate::stage::{Next, PipelineError, Stage};

/// Shows a status line in the assistant thread; status failures never stop the chain.
pub struct AssistantStatus {
    status: String,
}

impl AssistantStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[async_trait]
impl Stage for AssistantStatus {
    fn name(&self) -> &'static str {
        "assistant_status"
    }

    async fn handle(&self, chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        let Some(messenger) = chat.context().messenger().map(Arc::clone) else {
            return Err(PipelineError::MissingMessenger { stage: self.name() }.into());
        };
        if let Err(error) = messenger
            .set_assistant_status(chat.channel(), chat.thread(), &self.status)
            .await
        {
            tracing::warn!(
                channel = chat.channel(),
                status = %self.status,
                error = %format!("{error:#}"),
                "failed to set assistant status"
            );
        }
        next.run(chat).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::AssistantStatus;
    use crate::chat::Chat;
    use crate::stage::{Pipeline, PipelineError};
    use crate::stages::test_support::RecordingMessenger;
    use crate::stages::ClientInjection;

    #[tokio::test]
    async fn unit_assistant_status_requires_messenger() {
        let pipeline = Pipeline::builder()
            .stage(AssistantStatus::new("retrieving passages..."))
            .build();
        let error = pipeline
            .run(Chat::new("D1", "1.0", Vec::new()))
            .await
            .expect_err("no messenger");
        assert!(matches!(
            error.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingMessenger {
                stage: "assistant_status"
            })
        ));
    }

    #[tokio::test]
    async fn unit_assistant_status_omits_blank_thread() {
        let messenger = Arc::new(RecordingMessenger::default());
        let pipeline = Pipeline::builder()
            .stage(ClientInjection::new(messenger.clone(), None))
            .stage(AssistantStatus::new("generating response..."))
            .build();
        pipeline
            .run(Chat::new("C1", "", Vec::new()))
            .await
            .expect("run");
        assert_eq!(
            messenger.statuses(),
            vec![("C1".to_string(), None, "generating response...".to_string())]
        );
    }
}

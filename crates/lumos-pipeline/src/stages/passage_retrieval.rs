use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::Chat;
use crate::retrieval::PassageRetriever;
use crate::stage::{Next, Stage};

/// Looks up passages for the latest message. A miss or failure leaves the slot empty.
pub struct PassageRetrieval {
    retriever: Arc<dyn PassageRetriever>,
    limit: usize,
}

impl PassageRetrieval {
    pub fn new(retriever: Arc<dyn PassageRetriever>, limit: usize) -> Self {
        Self {
            retriever,
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl Stage for PassageRetrieval {
    fn name(&self) -> &'static str {
        "passage_retrieval"
    }

    async fn handle(&self, mut chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        let Some(query) = chat.query().map(str::to_string) else {
            tracing::warn!(channel = chat.channel(), "chat has no query to retrieve passages for");
            return next.run(chat).await;
        };

        match self.retriever.retrieve(&query, self.limit).await {
            Ok(passages) => {
                tracing::debug!(
                    channel = chat.channel(),
                    passages = passages.len(),
                    "retrieved passages"
                );
                chat.context_mut().set_passages(passages);
            }
            Err(error) => {
                tracing::warn!(
                    channel = chat.channel(),
                    error = %format!("{error:#}"),
                    "passage retrieval failed"
                );
            }
        }
        next.run(chat).await
    }
}

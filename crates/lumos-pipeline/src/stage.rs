//! Stage contract and the immutable stage chain built once at startup.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::Chat;

#[derive(Debug, Error, PartialEq, Eq)]
/// Precondition failures raised by stages.
pub enum PipelineError {
    #[error("{stage} requires a slack messenger in the chat context")]
    MissingMessenger { stage: &'static str },
}

/// One behavior over a [`Chat`].
///
/// A stage may extend the chat's side-channel and then call `next.run(chat)`,
/// or return without calling it to stop the chain.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, chat: Chat, next: Next<'_>) -> anyhow::Result<()>;
}

/// Remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
}

impl<'a> Next<'a> {
    pub async fn run(self, chat: Chat) -> anyhow::Result<()> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::trace!(stage = stage.name(), "entering pipeline stage");
                stage.handle(chat, Next { stages: rest }).await
            }
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder { stages: Vec::new() }
    }

    pub async fn run(&self, chat: Chat) -> anyhow::Result<()> {
        Next {
            stages: &self.stages,
        }
        .run(chat)
        .await
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

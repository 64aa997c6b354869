//! Composable answer pipeline: the `Chat` work unit, the stage chain, and its stages.

pub mod chat;
pub mod retrieval;
pub mod stage;
pub mod stages;

pub use chat::{Chat, ChatContext};
pub use retrieval::{HttpPassageRetriever, Passage, PassageRetriever};
pub use stage::{Next, Pipeline, PipelineBuilder, PipelineError, Stage};
pub use stages::{standard_pipeline, GenerationSettings, PipelineResources};

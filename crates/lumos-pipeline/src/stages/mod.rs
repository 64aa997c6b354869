//! Stages of the answer pipeline and the standard composition.

mod assistant_status;
mod chat_response;
mod client_injection;
mod failure_isolation;
mod passage_retrieval;
mod response_generation;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use lumos_ai::LlmClient;
use lumos_slack::SlackMessenger;

use crate::retrieval::PassageRetriever;
use crate::stage::Pipeline;

pub use assistant_status::AssistantStatus;
pub use chat_response::{
    feedback_blocks, ChatResponse, FEEDBACK_BAD_ACTION, FEEDBACK_BLOCK_ID, FEEDBACK_GOOD_ACTION,
};
pub use client_injection::ClientInjection;
pub use failure_isolation::FailureIsolation;
pub use passage_retrieval::PassageRetrieval;
pub use response_generation::{GenerationSettings, ResponseGeneration};

pub const STATUS_RETRIEVING: &str = "retrieving passages...";
pub const STATUS_GENERATING: &str = "generating response...";

pub const NO_RELATED_INFO_REPLY: &str = "I couldn't find any related information.";
pub const SERVICE_NOT_READY_REPLY: &str =
    "The service needed to generate an answer is not ready yet.";
pub const GENERATION_FAILED_REPLY: &str = "Failed to generate an answer.";
pub const EMPTY_RESPONSE_REPLY: &str =
    "I couldn't generate an answer.\nPlease contact an administrator.";

/// Collaborators shared by every invocation of the standard pipeline.
#[derive(Clone)]
pub struct PipelineResources {
    pub messenger: Arc<dyn SlackMessenger>,
    pub generator: Option<Arc<dyn LlmClient>>,
    pub retriever: Arc<dyn PassageRetriever>,
    pub generation: GenerationSettings,
    pub retrieval_limit: usize,
    pub feedback_buttons: bool,
}

/// Failure isolation, client injection, status, retrieval, status, generation, delivery.
pub fn standard_pipeline(resources: PipelineResources) -> Pipeline {
    Pipeline::builder()
        .stage(FailureIsolation)
        .stage(ClientInjection::new(resources.messenger, resources.generator))
        .stage(AssistantStatus::new(STATUS_RETRIEVING))
        .stage(PassageRetrieval::new(
            resources.retriever,
            resources.retrieval_limit,
        ))
        .stage(AssistantStatus::new(STATUS_GENERATING))
        .stage(ResponseGeneration::new(resources.generation))
        .stage(ChatResponse::new(resources.feedback_buttons))
        .build()
}

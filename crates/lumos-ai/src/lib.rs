//! Generation-client surface used by the Lumos answer pipeline.
mod openai;
mod retry;
mod types;

pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{
    ChatRequest, ChatResponse, ChatUsage, LlmClient, LumosAiError, Message, MessageRole,
};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lumos_ai::{LlmClient, OpenAiClient, OpenAiConfig};
use lumos_pipeline::stages::{standard_pipeline, GenerationSettings, PipelineResources};
use lumos_pipeline::{HttpPassageRetriever, PassageRetriever};
use lumos_slack::{
    SlackApiClient, SlackApiConfig, SlackMessenger, SocketModeConfig, SocketModeRunner,
    SocketModeSummary,
};
use tokio::sync::watch;

use crate::cli_args::BotConfig;
use crate::dispatcher::BotDispatcher;
use crate::feedback::{FeedbackSink, JsonlFeedbackLog};

pub fn slack_api_config(config: &BotConfig) -> SlackApiConfig {
    SlackApiConfig {
        api_base: config.slack_api_base.clone(),
        app_token: config.slack_app_token.clone(),
        bot_token: config.slack_bot_token.clone(),
        request_timeout_ms: config.request_timeout_ms,
        retry_max_attempts: config.retry_max_attempts,
        retry_base_delay_ms: config.retry_base_delay_ms,
    }
}

fn openai_config(config: &BotConfig) -> OpenAiConfig {
    OpenAiConfig {
        api_base: config.chat_api_url.clone(),
        api_key: config.chat_api_key.clone(),
        organization: None,
        request_timeout_ms: config.request_timeout_ms,
        max_retries: config.retry_max_attempts.saturating_sub(1),
        retry_budget_ms: 0,
    }
}

pub fn socket_mode_config(config: &BotConfig) -> SocketModeConfig {
    SocketModeConfig {
        reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
        max_reconnect_delay: Duration::from_millis(config.max_reconnect_delay_ms),
        connect_timeout: Duration::from_millis(config.request_timeout_ms),
        drain_timeout: Duration::from_millis(config.drain_timeout_ms),
    }
}

/// Wires every collaborator and returns a runner ready to serve socket sessions.
pub async fn build_runner(config: &BotConfig) -> Result<SocketModeRunner<BotDispatcher>> {
    let slack = SlackApiClient::new(slack_api_config(config))?;
    let generator =
        OpenAiClient::new(openai_config(config)).context("failed to create generation client")?;
    let retriever = HttpPassageRetriever::new(&config.retrieval_api_url, config.request_timeout_ms)
        .context("failed to create retrieval client")?;
    let feedback = JsonlFeedbackLog::open(&config.feedback_log)?;

    let bot_user_id = match slack.resolve_bot_user_id().await {
        Ok(user_id) => {
            tracing::info!(bot_user_id = %user_id, "resolved slack bot user id");
            Some(user_id)
        }
        Err(error) => {
            tracing::warn!(
                error = %format!("{error:#}"),
                "failed to resolve slack bot user id; relying on message bot markers"
            );
            None
        }
    };

    let messenger: Arc<dyn SlackMessenger> = Arc::new(slack.clone());
    let generator: Arc<dyn LlmClient> = Arc::new(generator);
    let retriever: Arc<dyn PassageRetriever> = Arc::new(retriever);
    let feedback: Arc<dyn FeedbackSink> = Arc::new(feedback);
    let pipeline = standard_pipeline(PipelineResources {
        messenger: Arc::clone(&messenger),
        generator: Some(generator),
        retriever,
        generation: GenerationSettings {
            model: config.chat_model.clone(),
            top_p: Some(config.chat_top_p),
            max_tokens: None,
        },
        retrieval_limit: config.retrieval_limit,
        feedback_buttons: config.feedback_buttons,
    });
    tracing::debug!(stages = ?pipeline.stage_names(), "assembled answer pipeline");

    let dispatcher =
        BotDispatcher::new(pipeline, messenger, feedback).with_bot_user_id(bot_user_id);
    Ok(SocketModeRunner::new(slack, Arc::new(dispatcher), socket_mode_config(config)))
}

pub async fn run_bot(
    config: &BotConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<SocketModeSummary> {
    let runner = build_runner(config).await?;
    runner.run(shutdown).await
}

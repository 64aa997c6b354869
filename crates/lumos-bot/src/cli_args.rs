use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_top_p(value: &str) -> Result<f32, String> {
    let parsed = value
        .parse::<f32>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || parsed <= 0.0 || parsed > 1.0 {
        return Err("value must be in range (0, 1]".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "lumos-bot",
    about = "Slack assistant that answers questions from retrieved reference material",
    version
)]
pub struct Cli {
    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack Socket Mode app token (xapp-...)"
    )]
    pub slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "LUMOS_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "chat-api-url",
        env = "CHAT_API_URL",
        help = "Base URL of the OpenAI-compatible chat-completions service"
    )]
    pub chat_api_url: Option<String>,

    #[arg(
        long = "chat-api-key",
        env = "CHAT_API_KEY",
        hide_env_values = true,
        help = "API key for the chat-completions service"
    )]
    pub chat_api_key: Option<String>,

    #[arg(
        long = "chat-model",
        env = "LUMOS_CHAT_MODEL",
        default_value = "gpt-5",
        help = "Model used to generate answers"
    )]
    pub chat_model: String,

    #[arg(
        long = "chat-top-p",
        env = "LUMOS_CHAT_TOP_P",
        default_value_t = 0.8,
        value_parser = parse_top_p,
        help = "Nucleus sampling value sent with generation requests"
    )]
    pub chat_top_p: f32,

    #[arg(
        long = "retrieval-api-url",
        env = "RETRIEVAL_API_URL",
        help = "Base URL of the passage retrieval service"
    )]
    pub retrieval_api_url: Option<String>,

    #[arg(
        long = "retrieval-limit",
        env = "LUMOS_RETRIEVAL_LIMIT",
        default_value_t = 5,
        value_parser = parse_positive_usize,
        help = "Maximum passages handed to generation"
    )]
    pub retrieval_limit: usize,

    #[arg(
        long = "feedback-log",
        env = "LUMOS_FEEDBACK_LOG",
        default_value = ".lumos/feedback.jsonl",
        help = "JSONL file that receives feedback button records"
    )]
    pub feedback_log: PathBuf,

    #[arg(
        long = "feedback-buttons",
        env = "LUMOS_FEEDBACK_BUTTONS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Attach good/bad feedback buttons to replies"
    )]
    pub feedback_buttons: bool,

    #[arg(
        long = "request-timeout-ms",
        env = "LUMOS_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for Slack, retrieval and generation HTTP requests and the socket handshake"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "LUMOS_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Maximum attempts for retryable Slack Web API failures"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "LUMOS_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base backoff delay for Slack Web API retries"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "reconnect-delay-ms",
        env = "LUMOS_RECONNECT_DELAY_MS",
        default_value_t = 1_000,
        value_parser = parse_positive_u64,
        help = "Delay before opening a new socket session"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long = "max-reconnect-delay-ms",
        env = "LUMOS_MAX_RECONNECT_DELAY_MS",
        default_value_t = 60_000,
        value_parser = parse_positive_u64,
        help = "Upper bound for reconnect backoff after repeated failures"
    )]
    pub max_reconnect_delay_ms: u64,

    #[arg(
        long = "drain-timeout-ms",
        env = "LUMOS_DRAIN_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "How long a closing session waits for in-flight handlers"
    )]
    pub drain_timeout_ms: u64,
}

/// Startup settings with every required value present and trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub slack_app_token: String,
    pub slack_bot_token: String,
    pub slack_api_base: String,
    pub chat_api_url: String,
    pub chat_api_key: String,
    pub chat_model: String,
    pub chat_top_p: f32,
    pub retrieval_api_url: String,
    pub retrieval_limit: usize,
    pub feedback_log: PathBuf,
    pub feedback_buttons: bool,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub drain_timeout_ms: u64,
}

fn require(flag: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("--{flag} is required and must not be blank"),
    }
}

impl Cli {
    pub fn validate(&self) -> Result<BotConfig> {
        let chat_model = self.chat_model.trim();
        if chat_model.is_empty() {
            bail!("--chat-model must not be blank");
        }
        let slack_api_base = self.slack_api_base.trim();
        if slack_api_base.is_empty() {
            bail!("--slack-api-base must not be blank");
        }
        if self.feedback_log.as_os_str().is_empty() {
            bail!("--feedback-log must not be blank");
        }

        Ok(BotConfig {
            slack_app_token: require("slack-app-token", self.slack_app_token.as_deref())?,
            slack_bot_token: require("slack-bot-token", self.slack_bot_token.as_deref())?,
            slack_api_base: slack_api_base.to_string(),
            chat_api_url: require("chat-api-url", self.chat_api_url.as_deref())?,
            chat_api_key: require("chat-api-key", self.chat_api_key.as_deref())?,
            chat_model: chat_model.to_string(),
            chat_top_p: self.chat_top_p,
            retrieval_api_url: require("retrieval-api-url", self.retrieval_api_url.as_deref())?,
            retrieval_limit: self.retrieval_limit,
            feedback_log: self.feedback_log.clone(),
            feedback_buttons: self.feedback_buttons,
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            reconnect_delay_ms: self.reconnect_delay_ms,
            max_reconnect_delay_ms: self.max_reconnect_delay_ms.max(self.reconnect_delay_ms),
            drain_timeout_ms: self.drain_timeout_ms,
        })
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumos_pipeline::stages::{FEEDBACK_BAD_ACTION, FEEDBACK_GOOD_ACTION};
use lumos_slack::interactive::{Action, BlockActionsPayload};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One good/bad vote on a posted answer.
pub struct FeedbackRecord {
    pub channel: Option<String>,
    pub user: String,
    pub team: Option<String>,
    pub thread_ts: Option<String>,
    pub action_id: String,
    pub value: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

pub fn is_feedback_action(action: &Action) -> bool {
    action.action_id == FEEDBACK_GOOD_ACTION || action.action_id == FEEDBACK_BAD_ACTION
}

/// Feedback records for every feedback button fired in one interaction.
pub fn feedback_records(payload: &BlockActionsPayload, now: DateTime<Utc>) -> Vec<FeedbackRecord> {
    let thread_ts = payload.resolve_thread_ts().map(str::to_string);
    let team = payload
        .team
        .as_ref()
        .map(|team| team.id.clone())
        .or_else(|| (!payload.user.team_id.is_empty()).then(|| payload.user.team_id.clone()));
    payload
        .actions
        .iter()
        .filter(|action| is_feedback_action(action))
        .map(|action| FeedbackRecord {
            channel: payload.channel_id().map(str::to_string),
            user: payload.user.id.clone(),
            team: team.clone(),
            thread_ts: thread_ts.clone(),
            action_id: action.action_id.clone(),
            value: action.value.clone(),
            recorded_at: now,
        })
        .collect()
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn record(&self, record: &FeedbackRecord) -> Result<()>;
}

#[derive(Clone)]
/// Append-only JSONL feedback store.
pub struct JsonlFeedbackLog {
    path: PathBuf,
    file: Arc<Mutex<std::fs::File>>,
}

impl JsonlFeedbackLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("failed to encode feedback record")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("feedback log mutex is poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl FeedbackSink for JsonlFeedbackLog {
    async fn record(&self, record: &FeedbackRecord) -> Result<()> {
        self.append(record)
    }
}

//! Interaction callbacks carried inside `interactive` socket frames.

use serde::{Deserialize, Serialize};

use crate::blockkit::Block;
use crate::discriminated::{decode_variant, Tagged, TaggedUnion, VariantDecoder};

pub const INTERACTION_BLOCK_ACTIONS: &str = "block_actions";
pub const INTERACTION_MESSAGE_ACTIONS: &str = "message_actions";
pub const INTERACTION_VIEW_CLOSED: &str = "view_closed";
pub const INTERACTION_VIEW_SUBMISSION: &str = "view_submission";

/// `payload` of an `interactive` frame.
pub type InteractionPayload = Tagged<InteractionVariant>;

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionVariant {
    BlockActions(BlockActionsPayload),
    MessageActions(MessageActionsPayload),
    ViewClosed(ViewClosedPayload),
    ViewSubmission(ViewSubmissionPayload),
}

impl From<BlockActionsPayload> for InteractionVariant {
    fn from(value: BlockActionsPayload) -> Self {
        Self::BlockActions(value)
    }
}

impl From<MessageActionsPayload> for InteractionVariant {
    fn from(value: MessageActionsPayload) -> Self {
        Self::MessageActions(value)
    }
}

impl From<ViewClosedPayload> for InteractionVariant {
    fn from(value: ViewClosedPayload) -> Self {
        Self::ViewClosed(value)
    }
}

impl From<ViewSubmissionPayload> for InteractionVariant {
    fn from(value: ViewSubmissionPayload) -> Self {
        Self::ViewSubmission(value)
    }
}

impl TaggedUnion for InteractionVariant {
    const NAME: &'static str = "interaction";
    const VARIANTS: &'static [(&'static str, VariantDecoder<Self>)] = &[
        (
            INTERACTION_BLOCK_ACTIONS,
            decode_variant::<BlockActionsPayload, InteractionVariant>,
        ),
        (
            INTERACTION_MESSAGE_ACTIONS,
            decode_variant::<MessageActionsPayload, InteractionVariant>,
        ),
        (
            INTERACTION_VIEW_CLOSED,
            decode_variant::<ViewClosedPayload, InteractionVariant>,
        ),
        (
            INTERACTION_VIEW_SUBMISSION,
            decode_variant::<ViewSubmissionPayload, InteractionVariant>,
        ),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub team_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionTeam {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionChannel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// One fired interactive component.
pub struct Action {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub action_id: String,
    #[serde(default)]
    pub block_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionContainer {
    #[serde(default)]
    pub thread_ts: String,
    #[serde(default)]
    pub message_ts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionMessage {
    #[serde(default)]
    pub thread_ts: String,
    #[serde(default)]
    pub ts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Sent when a user clicks a Block Kit interactive component.
pub struct BlockActionsPayload {
    #[serde(default)]
    pub user: InteractionUser,
    /// Absent for org-wide installs.
    #[serde(default)]
    pub team: Option<InteractionTeam>,
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub message_ts: String,
    #[serde(default)]
    pub container: ActionContainer,
    #[serde(default)]
    pub message: ActionMessage,
}

impl BlockActionsPayload {
    /// Thread the interaction belongs to: container thread, container message,
    /// then the top-level message timestamp.
    pub fn resolve_thread_ts(&self) -> Option<&str> {
        [
            self.container.thread_ts.as_str(),
            self.container.message_ts.as_str(),
            self.message.ts.as_str(),
        ]
        .into_iter()
        .find(|candidate| !candidate.trim().is_empty())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .map(|channel| channel.id.as_str())
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageActionsPayload {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub trigger_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewClosedPayload {
    #[serde(default)]
    pub is_cleared: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewSubmissionPayload {
    #[serde(default)]
    pub trigger_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    #[default]
    Ephemeral,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Body posted to an interaction's `response_url`.
pub struct ResponsePayload {
    pub response_type: ResponseType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub delete_original: bool,
    #[serde(default)]
    pub replace_original: bool,
}

impl ResponsePayload {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_thread(mut self, thread_ts: Option<&str>) -> Self {
        self.thread_ts = thread_ts.map(str::to_string);
        self
    }
}

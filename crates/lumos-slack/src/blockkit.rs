//! Block Kit subset used for replies and interaction responses.

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText {
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        emoji: bool,
    },
    Mrkdwn {
        text: String,
        #[serde(default, skip_serializing_if = "is_false")]
        verbatim: bool,
    },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Mrkdwn {
            text: text.into(),
            verbatim: false,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::PlainText { text, .. } | Self::Mrkdwn { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonElement {
    pub text: TextObject,
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(label: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            text: TextObject::PlainText {
                text: label.into(),
                emoji: false,
            },
            action_id: action_id.into(),
            value: None,
            style: None,
            url: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: TextObject,
    },
    Actions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<BlockElement>,
    },
    Context {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<TextObject>,
    },
    Divider {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
}

impl Block {
    pub fn section(text: TextObject) -> Self {
        Self::Section {
            block_id: None,
            text,
        }
    }

    pub fn actions(block_id: impl Into<String>, buttons: Vec<ButtonElement>) -> Self {
        Self::Actions {
            block_id: Some(block_id.into()),
            elements: buttons.into_iter().map(BlockElement::Button).collect(),
        }
    }

    pub fn context(elements: Vec<TextObject>) -> Self {
        Self::Context {
            block_id: None,
            elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Block, ButtonElement, ButtonStyle, TextObject};

    #[test]
    fn unit_actions_block_serializes_buttons_with_style() {
        let block = Block::actions(
            "actionblock789",
            vec![ButtonElement::new("good", "feedback_good")
                .with_value("feedback_good")
                .with_style(ButtonStyle::Primary)],
        );
        assert_eq!(
            serde_json::to_value(&block).expect("serialize"),
            json!({
                "type": "actions",
                "block_id": "actionblock789",
                "elements": [{
                    "type": "button",
                    "text": {"type": "plain_text", "text": "good"},
                    "action_id": "feedback_good",
                    "value": "feedback_good",
                    "style": "primary"
                }]
            })
        );
    }

    #[test]
    fn unit_section_and_context_blocks_use_text_objects() {
        let section = serde_json::to_value(Block::section(TextObject::markdown("*hi*")))
            .expect("serialize");
        assert_eq!(
            section,
            json!({"type": "section", "text": {"type": "mrkdwn", "text": "*hi*"}})
        );

        let context = serde_json::to_value(Block::context(vec![TextObject::plain("note")]))
            .expect("serialize");
        assert_eq!(
            context,
            json!({"type": "context", "elements": [{"type": "plain_text", "text": "note", "emoji": true}]})
        );
    }

    #[test]
    fn functional_blocks_decode_from_slack_message_json() {
        let block: Block = serde_json::from_value(json!({
            "type": "section",
            "block_id": "b1",
            "text": {"type": "mrkdwn", "text": "answer", "verbatim": true}
        }))
        .expect("decode");
        let Block::Section { block_id, text } = block else {
            panic!("expected section block");
        };
        assert_eq!(block_id.as_deref(), Some("b1"));
        assert_eq!(text.text(), "answer");
    }
}

//! Socket Mode frames received over the websocket and the acknowledgment sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discriminated::{
    decode_tagged, decode_variant, FrameDecodeError, TaggedUnion, VariantDecoder,
};
use crate::events_api::EventsApiPayload;
use crate::interactive::InteractionPayload;

pub const SOCKET_FRAME_HELLO: &str = "hello";
pub const SOCKET_FRAME_DISCONNECT: &str = "disconnect";
pub const SOCKET_FRAME_EVENTS_API: &str = "events_api";
pub const SOCKET_FRAME_INTERACTIVE: &str = "interactive";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Control frame that completes the connection handshake.
pub struct Hello {
    #[serde(default, rename = "num_connections")]
    pub connection_count: u32,
    #[serde(default)]
    pub connection_info: ConnectionInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
/// Control frame asking the client to drop this connection.
pub struct Disconnect {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventsApiEnvelope {
    pub envelope_id: String,
    #[serde(default)]
    pub payload: Option<EventsApiPayload>,
    #[serde(default)]
    pub accepts_response_payload: bool,
    #[serde(default)]
    pub retry_attempt: u32,
    #[serde(default)]
    pub retry_reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractiveEnvelope {
    pub envelope_id: String,
    #[serde(default)]
    pub payload: Option<InteractionPayload>,
    #[serde(default)]
    pub accepts_response_payload: bool,
}

#[derive(Debug, Clone, PartialEq)]
/// Enumerates the socket frame kinds this client understands.
pub enum SocketFrame {
    Hello(Hello),
    Disconnect(Disconnect),
    EventsApi(EventsApiEnvelope),
    Interactive(InteractiveEnvelope),
}

impl From<Hello> for SocketFrame {
    fn from(value: Hello) -> Self {
        Self::Hello(value)
    }
}

impl From<Disconnect> for SocketFrame {
    fn from(value: Disconnect) -> Self {
        Self::Disconnect(value)
    }
}

impl From<EventsApiEnvelope> for SocketFrame {
    fn from(value: EventsApiEnvelope) -> Self {
        Self::EventsApi(value)
    }
}

impl From<InteractiveEnvelope> for SocketFrame {
    fn from(value: InteractiveEnvelope) -> Self {
        Self::Interactive(value)
    }
}

impl TaggedUnion for SocketFrame {
    const NAME: &'static str = "socket frame";
    const VARIANTS: &'static [(&'static str, VariantDecoder<Self>)] = &[
        (SOCKET_FRAME_HELLO, decode_variant::<Hello, SocketFrame>),
        (SOCKET_FRAME_DISCONNECT, decode_variant::<Disconnect, SocketFrame>),
        (SOCKET_FRAME_EVENTS_API, decode_variant::<EventsApiEnvelope, SocketFrame>),
        (SOCKET_FRAME_INTERACTIVE, decode_variant::<InteractiveEnvelope, SocketFrame>),
    ];
}

#[derive(Debug, Clone, PartialEq)]
/// One decoded websocket frame.
///
/// `frame` is `None` when the discriminator is not one this client knows; the
/// raw text is always kept for diagnostics.
pub struct SocketEnvelope {
    pub kind: String,
    pub frame: Option<SocketFrame>,
    pub raw: String,
}

impl SocketEnvelope {
    /// Envelope id for frames that must be acknowledged.
    pub fn envelope_id(&self) -> Option<&str> {
        match self.frame.as_ref()? {
            SocketFrame::EventsApi(envelope) => Some(envelope.envelope_id.as_str()),
            SocketFrame::Interactive(envelope) => Some(envelope.envelope_id.as_str()),
            SocketFrame::Hello(_) | SocketFrame::Disconnect(_) => None,
        }
    }
}

/// Decodes a raw socket frame; fails only on malformed syntax or a malformed known variant.
pub fn decode_socket_envelope(raw: &str) -> Result<SocketEnvelope, FrameDecodeError> {
    let value = serde_json::from_str::<Value>(raw).map_err(FrameDecodeError::Syntax)?;
    let tagged = decode_tagged::<SocketFrame>(&value)?;
    Ok(SocketEnvelope {
        kind: tagged.kind,
        frame: tagged.variant,
        raw: raw.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Receipt echo for `events_api` and `interactive` frames.
pub struct Acknowledgment {
    pub envelope_id: String,
}

impl Acknowledgment {
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::json!({ "envelope_id": self.envelope_id }).to_string()
    }
}

//! Slack Socket Mode transport: frame decoding, Web API access, and the connection lifecycle.

pub mod api_client;
pub mod blockkit;
pub mod connection;
pub mod discriminated;
pub mod events_api;
pub mod interactive;
mod slack_helpers;
pub mod socket_envelope;
pub mod socket_mode;

pub use api_client::{
    PostMessageRequest, SlackApiClient, SlackApiConfig, SlackMessenger, SlackPostedMessage,
};
pub use connection::{
    CloseReason, ConnectionConfig, ConnectionManager, ConnectionState, EnvelopeHandler,
    SessionReport,
};
pub use discriminated::{FrameDecodeError, Tagged};
pub use socket_envelope::{decode_socket_envelope, Acknowledgment, SocketEnvelope, SocketFrame};
pub use socket_mode::{SocketModeConfig, SocketModeRunner, SocketModeSummary};

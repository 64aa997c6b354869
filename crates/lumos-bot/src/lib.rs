//! Slack assistant binary support: configuration, wiring and event routing.

pub mod bootstrap_helpers;
pub mod cli_args;
pub mod dispatcher;
pub mod feedback;
pub mod runtime;

pub use cli_args::{BotConfig, Cli};
pub use dispatcher::{BotDispatcher, FEEDBACK_THANKS_REPLY, GREETING_REPLY};
pub use feedback::{FeedbackRecord, FeedbackSink, JsonlFeedbackLog};
pub use runtime::{build_runner, run_bot};

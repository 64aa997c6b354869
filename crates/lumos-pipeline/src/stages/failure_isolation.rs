use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::chat::Chat;
use crate::stage::{Next, Stage};

/// Outermost fault boundary: errors and panics from the rest of the chain are
/// logged and the invocation is dropped.
pub struct FailureIsolation;

#[async_trait]
impl Stage for FailureIsolation {
    fn name(&self) -> &'static str {
        "failure_isolation"
    }

    async fn handle(&self, chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
        let channel = chat.channel().to_string();
        let thread_ts = chat.thread_ts().to_string();
        match AssertUnwindSafe(next.run(chat)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::error!(
                    channel = %channel,
                    thread_ts = %thread_ts,
                    error = %format!("{error:#}"),
                    "chat pipeline failed"
                );
            }
            Err(panic) => {
                tracing::error!(
                    channel = %channel,
                    thread_ts = %thread_ts,
                    panic = %panic_message(panic.as_ref()),
                    "chat pipeline panicked"
                );
            }
        }
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{panic_message, FailureIsolation};
    use crate::chat::Chat;
    use crate::stage::{Next, Pipeline, PipelineError, Stage};

    struct Panicking;

    #[async_trait]
    impl Stage for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn handle(&self, _chat: Chat, _next: Next<'_>) -> anyhow::Result<()> {
            panic!("index out of range");
        }
    }

    struct Failing;

    #[async_trait]
    impl Stage for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _chat: Chat, _next: Next<'_>) -> anyhow::Result<()> {
            Err(PipelineError::MissingMessenger { stage: "failing" }.into())
        }
    }

    struct Flag(Arc<AtomicBool>);

    #[async_trait]
    impl Stage for Flag {
        fn name(&self) -> &'static str {
            "flag"
        }

        async fn handle(&self, chat: Chat, next: Next<'_>) -> anyhow::Result<()> {
            self.0.store(true, Ordering::SeqCst);
            next.run(chat).await
        }
    }

    #[tokio::test]
    async fn unit_failure_isolation_swallows_panics_from_inner_stages() {
        let pipeline = Pipeline::builder()
            .stage(FailureIsolation)
            .stage(Panicking)
            .build();
        pipeline
            .run(Chat::new("D1", "1.0", Vec::new()))
            .await
            .expect("panic is contained");
    }

    #[tokio::test]
    async fn unit_failure_isolation_swallows_stage_errors() {
        let reached = Arc::new(AtomicBool::new(false));
        let pipeline = Pipeline::builder()
            .stage(FailureIsolation)
            .stage(Flag(Arc::clone(&reached)))
            .stage(Failing)
            .build();
        pipeline
            .run(Chat::new("D1", "1.0", Vec::new()))
            .await
            .expect("error is contained");
        assert!(reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn regression_errors_escape_without_failure_isolation() {
        let pipeline = Pipeline::builder().stage(Failing).build();
        let error = pipeline
            .run(Chat::new("D1", "1.0", Vec::new()))
            .await
            .expect_err("no boundary");
        assert_eq!(
            error.downcast_ref::<PipelineError>(),
            Some(&PipelineError::MissingMessenger { stage: "failing" })
        );
    }

    #[test]
    fn unit_panic_message_reads_string_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}

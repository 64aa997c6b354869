use anyhow::Result;
use clap::Parser;
use lumos_bot::bootstrap_helpers::init_tracing;
use lumos_bot::{run_bot, Cli};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Cli::parse().validate()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received ctrl-c; shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    });

    let summary = run_bot(&config, shutdown_rx).await?;
    tracing::info!(
        sessions = summary.sessions,
        acknowledged = summary.acknowledged,
        "lumos bot stopped"
    );
    Ok(())
}

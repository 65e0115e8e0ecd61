//! SIGTERM handling lives in its own test binary: the signal is process-wide
//! and would stop every server running alongside it.
#![cfg(unix)]

use color_eyre::eyre::{Result, eyre};
use sshfolio::ServerConfig;
use sshfolio::common::spawn_test_server;
use std::time::Duration;
use tempfile::TempDir;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::timeout;

#[tokio::test]
async fn test_sigterm_stops_server() -> Result<()> {
    // Replace the default SIGTERM action before anything can deliver it.
    let mut sigterm = signal(SignalKind::terminate())?;

    let content = TempDir::new()?;
    let server = spawn_test_server(
        ServerConfig::default()
            .with_content_dir(content.path())
            .with_shutdown_grace(Duration::from_millis(200)),
    )
    .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()?;
    assert!(status.success());

    timeout(Duration::from_secs(5), sigterm.recv())
        .await?
        .ok_or_else(|| eyre!("signal stream closed"))?;
    let result = timeout(Duration::from_secs(5), server.handle).await??;
    assert!(result.is_ok());
    Ok(())
}

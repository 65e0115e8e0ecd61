use color_eyre::eyre::{Result, WrapErr};
use sshfolio::{PortfolioServer, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging; RUST_LOG overrides the default filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sshfolio=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env().wrap_err("Invalid configuration")?;
    if config.uses_default_password() {
        warn!("SSH_PASSWORD is not set, using the default password");
    }

    info!(
        address = %config.bind_addr(),
        rate_limit = config.max_per_minute.get(),
        content_dir = %config.content_dir.display(),
        host_key = %config.host_key_path.display(),
        "Starting SSH portfolio server"
    );

    let server = PortfolioServer::new(config).wrap_err("Failed to initialize SSH server")?;
    info!(fingerprint = %server.fingerprint(), "Host key ready");
    server.run().await.wrap_err("Failed to run SSH server")?;

    Ok(())
}

use crate::config::ServerConfig;
use crate::security::LimiterRegistry;
use crate::ssh::PortfolioServer;
use crate::{PortfolioError, Result};
use russh::client;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A server running on an ephemeral loopback port for integration tests
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<()>>,
    pub shutdown: broadcast::Sender<()>,
    pub registry: Arc<LimiterRegistry>,
    _key_dir: TempDir,
}

impl TestServer {
    /// Signals shutdown and waits for the accept loop to return
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .map_err(|e| PortfolioError::Io(std::io::Error::other(e)))?
    }
}

/// Starts a server for `config` on 127.0.0.1 with a throwaway host key
///
/// The listener is bound before the server task starts, so clients can
/// connect as soon as this returns.
pub async fn spawn_test_server(config: ServerConfig) -> Result<TestServer> {
    let key_dir = TempDir::new()?;
    let config = config.with_host_key_path(key_dir.path().join("ssh_host_ed25519_key"));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = PortfolioServer::new(config)?;
    let shutdown = server.shutdown_signal();
    let registry = server.registry().clone();
    let handle = tokio::spawn(async move { server.run_on(listener).await });

    Ok(TestServer {
        addr,
        handle,
        shutdown,
        registry,
        _key_dir: key_dir,
    })
}

/// Client callbacks that trust any host key
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingClient;

impl client::Handler for TrustingClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Opens an SSH connection to `addr` without authenticating
pub async fn connect_client(addr: SocketAddr) -> Result<client::Handle<TrustingClient>> {
    let config = Arc::new(client::Config::default());
    Ok(client::connect(config, addr, TrustingClient).await?)
}

/// Opens an SSH connection and authenticates with a password
///
/// Returns `Ok(None)` when the server rejects the credentials.
pub async fn login(
    addr: SocketAddr,
    user: &str,
    password: &str,
) -> Result<Option<client::Handle<TrustingClient>>> {
    let mut handle = connect_client(addr).await?;
    let auth = handle.authenticate_password(user, password).await?;
    Ok(auth.success().then_some(handle))
}

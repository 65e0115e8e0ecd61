use super::handler::{ConnectionHandler, SessionSettings};
use super::host_key;
use crate::config::ServerConfig;
use crate::network::PeerAddr;
use crate::security::{AuthGate, ConnectionGate, LimiterRegistry, spawn_sweeper};
use crate::Result;
use russh::keys::PrivateKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::{signal, time::timeout};
use tracing::{Instrument, error, info, warn};

/// Sessions idle this long are disconnected by the SSH layer
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);

/// SSH server that screens every connection before the handshake
pub struct PortfolioServer {
    config: ServerConfig,
    ssh_config: Arc<russh::server::Config>,
    gate: ConnectionGate,
    auth: Arc<AuthGate>,
    settings: Arc<SessionSettings>,
    shutdown_signal: Arc<broadcast::Sender<()>>,
}

impl PortfolioServer {
    /// Creates a server, loading or generating its host key
    pub fn new(config: ServerConfig) -> Result<Self> {
        let key = host_key::load_or_generate(&config.host_key_path)?;
        Ok(Self::with_host_key(config, key))
    }

    /// Creates a server with an already loaded host key
    pub fn with_host_key(config: ServerConfig, key: PrivateKey) -> Self {
        let ssh_config = russh::server::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            auth_rejection_time: config.auth_rejection_delay,
            auth_rejection_time_initial: Some(Duration::ZERO),
            keys: vec![key],
            ..Default::default()
        };

        let registry = Arc::new(LimiterRegistry::new(config.max_per_minute));
        let gate = ConnectionGate::new(registry, config.deny_delay);
        let auth = Arc::new(AuthGate::new(config.password.clone()));
        let settings = Arc::new(SessionSettings {
            content_dir: config.content_dir.clone(),
            splash_duration: config.splash_duration,
        });
        let (shutdown_signal, _) = broadcast::channel(1);

        Self {
            config,
            ssh_config: Arc::new(ssh_config),
            gate,
            auth,
            settings,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Binds the configured address and serves until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.run_on(listener).await
    }

    /// Serves connections from an already bound listener until shutdown
    pub async fn run_on(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            rate_limit = self.config.max_per_minute.get(),
            "SSH portfolio server listening"
        );

        let sweeper = spawn_sweeper(
            self.gate.registry().clone(),
            self.config.sweep_interval,
            self.config.sweep_policy,
            self.shutdown_signal.subscribe(),
        );
        let mut shutdown_rx = self.shutdown_signal.subscribe();
        let mut connections = JoinSet::new();
        let terminate = terminate();
        tokio::pin!(terminate);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => self.spawn_connection(&mut connections, stream, PeerAddr::from(addr)),
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    let _ = self.shutdown_signal.send(());
                    break;
                }
                _ = &mut terminate => {
                    info!("Received SIGTERM, stopping server");
                    let _ = self.shutdown_signal.send(());
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }
        drop(listener);

        let remaining = connections.len();
        if remaining > 0 {
            info!(remaining, grace = ?self.config.shutdown_grace, "Waiting for sessions to close");
            if timeout(self.config.shutdown_grace, drain(&mut connections)).await.is_err() {
                warn!(remaining = connections.len(), "Aborting sessions still open after grace period");
                connections.abort_all();
                drain(&mut connections).await;
            }
        }
        let _ = sweeper.await;

        info!("SSH portfolio server stopped");
        Ok(())
    }

    fn spawn_connection(&self, connections: &mut JoinSet<()>, stream: TcpStream, peer: PeerAddr) {
        let gate = self.gate.clone();
        let ssh_config = self.ssh_config.clone();
        let handler = ConnectionHandler::new(
            peer.clone(),
            self.auth.clone(),
            self.settings.clone(),
            self.shutdown_signal.as_ref().clone(),
        );
        let span = tracing::info_span!("connection", %peer);

        connections.spawn(
            async move {
                let Some(stream) = gate.screen(stream, &peer).await else {
                    return;
                };
                match serve(ssh_config, stream, handler).await {
                    Ok(()) => info!("Connection closed"),
                    Err(e) => warn!(error = %e, "Connection ended with error"),
                }
            }
            .instrument(span),
        );
    }

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        self.gate.registry()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Host key fingerprint clients will see
    pub fn fingerprint(&self) -> String {
        self.ssh_config
            .keys
            .first()
            .map(host_key::fingerprint)
            .unwrap_or_default()
    }
}

async fn serve(
    config: Arc<russh::server::Config>,
    stream: TcpStream,
    handler: ConnectionHandler,
) -> Result<()> {
    let session = russh::server::run_stream(config, stream, handler).await?;
    session.await
}

/// Resolves when the process is asked to terminate
#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

async fn drain(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ServerConfig {
        ServerConfig::default()
            .with_host_key_path(dir.path().join("host_key"))
            .with_content_dir(dir.path().join("content"))
    }

    #[test]
    fn test_new_creates_host_key() {
        let dir = TempDir::new().unwrap();
        let server = PortfolioServer::new(config(&dir)).unwrap();

        assert!(dir.path().join("host_key").exists());
        assert!(server.fingerprint().starts_with("SHA256:"));
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_run_on() {
        let dir = TempDir::new().unwrap();
        let server = Arc::new(PortfolioServer::new(config(&dir)).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = server.shutdown_signal();

        let running = {
            let server = server.clone();
            tokio::spawn(async move { server.run_on(listener).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(()).unwrap();

        let result = timeout(Duration::from_secs(5), running).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}

use crate::config::ConfigError;
use crate::ssh::session::LifecycleError;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for the sshfolio library
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// Socket and filesystem errors (bind, accept, read, write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The host key could not be read, written or generated
    #[error("Host key error at {}: {source}", path.display())]
    HostKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host key file exists but is not a valid OpenSSH private key
    #[error("Host key encoding error: {0}")]
    KeyEncoding(#[from] russh::keys::ssh_key::Error),

    /// SSH transport errors
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// A session received a request that is illegal in its current state
    #[error("Session lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// The client channel went away while a frame was being written
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for the sshfolio library
pub type Result<T> = std::result::Result<T, PortfolioError>;

pub mod common;
pub mod config;
pub mod content;
pub mod network;
pub mod security;
pub mod ssh;
pub mod tui;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use content::{Tab, load_tabs};
pub use network::{PeerAddr, RateKey};
pub use security::{AuthGate, ConnectionGate, LimiterRegistry, SweepPolicy, TokenBucket};
pub use ssh::PortfolioServer;

use super::LimiterRegistry;
use crate::network::{PeerAddr, RateKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Outcome of screening one inbound connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed(RateKey),
    Denied(RateKey),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed(_))
    }

    pub fn key(&self) -> &RateKey {
        match self {
            Admission::Allowed(key) | Admission::Denied(key) => key,
        }
    }
}

/// Admission control run on every raw connection before the SSH handshake
///
/// # Examples
///
/// ```
/// use sshfolio::{ConnectionGate, LimiterRegistry, PeerAddr};
/// use std::num::NonZeroU32;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let registry = Arc::new(LimiterRegistry::new(NonZeroU32::new(1).unwrap()));
/// let gate = ConnectionGate::new(registry, Duration::from_millis(500));
/// let peer: PeerAddr = "203.0.113.9:41000".into();
///
/// assert!(gate.check(&peer).is_allowed());
/// assert!(!gate.check(&peer).is_allowed());
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionGate {
    registry: Arc<LimiterRegistry>,
    deny_delay: Duration,
}

impl ConnectionGate {
    pub fn new(registry: Arc<LimiterRegistry>, deny_delay: Duration) -> Self {
        Self {
            registry,
            deny_delay,
        }
    }

    /// Decides whether `peer` may proceed, consuming one token if so
    pub fn check(&self, peer: &PeerAddr) -> Admission {
        let key = peer.rate_key();
        if self.registry.allow(&key) {
            Admission::Allowed(key)
        } else {
            Admission::Denied(key)
        }
    }

    /// Screens a freshly accepted stream
    ///
    /// Returns the stream untouched if the peer is admitted. Otherwise waits
    /// out the deny delay, closes the stream and returns `None`. This runs on
    /// the connection's own task, never on the accept loop.
    pub async fn screen<S>(&self, mut stream: S, peer: &PeerAddr) -> Option<S>
    where
        S: AsyncWrite + Unpin,
    {
        match self.check(peer) {
            Admission::Allowed(key) => {
                info!(ip = %key, "New connection");
                Some(stream)
            }
            Admission::Denied(key) => {
                debug!(ip = %key, "Connection dropped: rate limited");
                tokio::time::sleep(self.deny_delay).await;
                let _ = stream.shutdown().await;
                None
            }
        }
    }

    pub fn registry(&self) -> &Arc<LimiterRegistry> {
        &self.registry
    }
}

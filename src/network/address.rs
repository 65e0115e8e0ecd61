use std::fmt;
use std::net::SocketAddr;

/// Remote address of an inbound connection
///
/// Most transports hand us a structured `SocketAddr`. Anything else is kept
/// in its textual form and parsed on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddr {
    /// Structured network address (TCP)
    Network(SocketAddr),
    /// Textual remote address from an unusual transport
    Other(String),
}

/// Identity a client is rate limited under: its IP, without port
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey(String);

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddr::Network(addr) => write!(f, "{addr}"),
            PeerAddr::Other(text) => f.write_str(text),
        }
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        PeerAddr::Network(addr)
    }
}

impl From<&str> for PeerAddr {
    fn from(s: &str) -> Self {
        match s.parse::<SocketAddr>() {
            Ok(addr) => PeerAddr::Network(addr),
            Err(_) => PeerAddr::Other(s.to_string()),
        }
    }
}

impl PeerAddr {
    /// Returns the key this peer is rate limited under
    ///
    /// IPv4-mapped IPv6 addresses collapse onto their IPv4 form so one client
    /// cannot hold two buckets.
    pub fn rate_key(&self) -> RateKey {
        match self {
            PeerAddr::Network(addr) => RateKey(addr.ip().to_canonical().to_string()),
            PeerAddr::Other(text) => RateKey(host_part(text).to_string()),
        }
    }

    /// Get the network address if this is a structured address
    pub fn as_network(&self) -> Option<&SocketAddr> {
        match self {
            PeerAddr::Network(addr) => Some(addr),
            PeerAddr::Other(_) => None,
        }
    }
}

/// Everything before the port separator, or the whole text if there is none
fn host_part(text: &str) -> &str {
    let text = text.trim();
    if let Ok(addr) = text.parse::<SocketAddr>() {
        // `Other` built directly may still hold a well-formed address.
        return match addr {
            SocketAddr::V4(_) => text.rsplit_once(':').map_or(text, |(host, _)| host),
            SocketAddr::V6(_) => bracketed(text).unwrap_or(text),
        };
    }
    if let Some(host) = bracketed(text) {
        return host;
    }
    match text.rsplit_once(':') {
        // A second colon means a bare IPv6 literal, not host:port.
        Some((host, _)) if !host.is_empty() && !host.contains(':') => host,
        _ => text,
    }
}

fn bracketed(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('[')?;
    let (host, _) = rest.split_once(']')?;
    (!host.is_empty()).then_some(host)
}

impl RateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RateKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

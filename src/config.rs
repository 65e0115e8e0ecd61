use crate::security::SweepPolicy;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

/// Password used when `SSH_PASSWORD` is not set. Operators must override it.
pub const DEFAULT_PASSWORD: &str = "portfolio";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("rate limit must be at least 1 request per minute")]
    ZeroRateLimit,
}

/// Immutable server configuration, loaded once at startup
///
/// # Examples
///
/// ```
/// use sshfolio::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_port(2022)
///     .with_password("hunter2")
///     .with_deny_delay(Duration::from_millis(100));
///
/// assert_eq!(config.port, 2022);
/// assert_eq!(config.max_per_minute.get(), 60);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_ip: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared secret every client must present
    pub password: String,
    /// Where the host identity key lives
    pub host_key_path: PathBuf,
    /// Connections per minute per client IP; also the burst capacity
    pub max_per_minute: NonZeroU32,
    /// Directory holding the markdown tab sources
    pub content_dir: PathBuf,
    /// How often the limiter registry is swept
    pub sweep_interval: Duration,
    /// What a sweep evicts
    pub sweep_policy: SweepPolicy,
    /// Pause before a rate-limited connection is closed
    pub deny_delay: Duration,
    /// How long the splash screen stays up unless a key is pressed
    pub splash_duration: Duration,
    /// How long in-flight sessions get to close after shutdown
    pub shutdown_grace: Duration,
    /// Delay the SSH layer applies before answering a failed password
    pub auth_rejection_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 2222,
            password: DEFAULT_PASSWORD.to_string(),
            host_key_path: PathBuf::from("./data/ssh_host_ed25519_key"),
            max_per_minute: NonZeroU32::new(60).unwrap_or(NonZeroU32::MIN),
            content_dir: PathBuf::from("./content"),
            sweep_interval: Duration::from_secs(5 * 60),
            sweep_policy: SweepPolicy::ClearAll,
            deny_delay: Duration::from_millis(500),
            splash_duration: Duration::from_millis(2500),
            shutdown_grace: Duration::from_secs(5),
            auth_rejection_delay: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a configuration from an arbitrary variable source
    ///
    /// Unset or empty variables keep their defaults; set but malformed ones
    /// are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get("BIND_ADDR") {
            config.bind_ip = parse("BIND_ADDR", &value)?;
        }
        if let Some(value) = get("PORT") {
            config.port = parse("PORT", &value)?;
        }
        if let Some(value) = get("SSH_PASSWORD") {
            config.password = value;
        }
        if let Some(value) = get("HOST_KEY_PATH") {
            config.host_key_path = PathBuf::from(value);
        }
        if let Some(value) = get("RATE_LIMIT") {
            let per_minute: u32 = parse("RATE_LIMIT", &value)?;
            config.max_per_minute = NonZeroU32::new(per_minute).ok_or(ConfigError::ZeroRateLimit)?;
        }
        if let Some(value) = get("CONTENT_DIR") {
            config.content_dir = PathBuf::from(value);
        }

        Ok(config)
    }

    /// Socket address the listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// True while the insecure placeholder secret is still configured
    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_PASSWORD
    }

    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_host_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_key_path = path.into();
        self
    }

    pub fn with_max_per_minute(mut self, per_minute: NonZeroU32) -> Self {
        self.max_per_minute = per_minute;
        self
    }

    pub fn with_content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = dir.into();
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_sweep_policy(mut self, policy: SweepPolicy) -> Self {
        self.sweep_policy = policy;
        self
    }

    pub fn with_deny_delay(mut self, delay: Duration) -> Self {
        self.deny_delay = delay;
        self
    }

    pub fn with_splash_duration(mut self, duration: Duration) -> Self {
        self.splash_duration = duration;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_auth_rejection_delay(mut self, delay: Duration) -> Self {
        self.auth_rejection_delay = delay;
        self
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 2222);
        assert_eq!(config.password, "portfolio");
        assert_eq!(config.max_per_minute.get(), 60);
        assert_eq!(config.host_key_path, PathBuf::from("./data/ssh_host_ed25519_key"));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.deny_delay, Duration::from_millis(500));
        assert!(config.uses_default_password());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "3000"),
            ("SSH_PASSWORD", "test123"),
            ("RATE_LIMIT", "10"),
            ("HOST_KEY_PATH", "/tmp/key"),
            ("CONTENT_DIR", "/srv/content"),
            ("BIND_ADDR", "127.0.0.1"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.password, "test123");
        assert_eq!(config.max_per_minute.get(), 10);
        assert_eq!(config.host_key_path, PathBuf::from("/tmp/key"));
        assert_eq!(config.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.bind_addr(), "127.0.0.1:3000".parse().unwrap());
        assert!(!config.uses_default_password());
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[("PORT", ""), ("SSH_PASSWORD", " ")])).unwrap();
        assert_eq!(config.port, 2222);
        assert_eq!(config.password, "portfolio");
    }

    #[test]
    fn test_malformed_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn test_zero_rate_limit_is_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("RATE_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroRateLimit));
    }
}

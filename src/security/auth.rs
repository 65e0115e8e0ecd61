use std::fmt;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Password check against the configured shared secret
///
/// The username is recorded for logging only and never restricts access.
/// Failed attempts are not throttled here; admission control already ran
/// before the handshake.
#[derive(Clone)]
pub struct AuthGate {
    secret: String,
}

impl AuthGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns true if `secret` matches the configured one
    pub fn check_credential(&self, username: &str, secret: &str) -> bool {
        if bool::from(secret.as_bytes().ct_eq(self.secret.as_bytes())) {
            info!(user = username, "Successful authentication");
            true
        } else {
            warn!(user = username, "Failed authentication attempt");
            false
        }
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate").field("secret", &"<redacted>").finish()
    }
}

//! Shared types for Scangate

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credentials for the scanning service.
///
/// The token authenticates every outbound call; the HMAC secret, when
/// present, additionally signs each request. Both are wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AuthConfig {
    /// API token sent as a bearer credential
    #[serde(default)]
    pub token: String,

    /// Shared secret for HMAC-SHA256 request signing (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac_secret: Option<String>,
}

impl AuthConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            hmac_secret: None,
        }
    }

    /// Set the request-signing secret
    pub fn with_hmac_secret(mut self, secret: impl Into<String>) -> Self {
        self.hmac_secret = Some(secret.into());
        self
    }

    /// The signing secret, treating an empty string as unset
    pub fn hmac_secret(&self) -> Option<&str> {
        self.hmac_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether outbound requests will carry signature headers
    pub fn signing_enabled(&self) -> bool {
        self.hmac_secret().is_some()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("hmac_secret", &self.hmac_secret().map(|_| "<redacted>"))
            .finish()
    }
}

/// Normalize a registry hostname for use as a cache key.
///
/// Lowercases, strips an `http://` or `https://` prefix and any trailing
/// slashes, so `https://GCR.io/` and `gcr.io` collide.
pub fn normalize_hostname(hostname: &str) -> String {
    let trimmed = hostname.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    without_scheme.trim_end_matches('/').to_string()
}

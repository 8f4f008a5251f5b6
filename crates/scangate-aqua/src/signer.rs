//! HMAC-SHA256 request signing
//!
//! Outbound requests to the scanning service are signed over a canonical
//! message of four newline-joined parts:
//!
//! ```text
//! METHOD\nURL\nTIMESTAMP\nBODY
//! ```
//!
//! The timestamp is RFC3339 UTC and is sent alongside the hex signature in
//! the `X-Aqua-Timestamp` / `X-Aqua-Signature` headers. Verification uses a
//! constant-time comparison.

use chrono::SecondsFormat;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue};
use scangate_core::{AuthConfig, Clock, Error, Result};
use sha2::Sha256;
use std::sync::Arc;
use tracing::trace;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signing timestamp
pub const TIMESTAMP_HEADER: &str = "X-Aqua-Timestamp";

/// Header carrying the hex-encoded signature
pub const SIGNATURE_HEADER: &str = "X-Aqua-Signature";

/// Build the canonical message. No trailing newline; the body is taken raw.
pub fn canonical_message(method: &str, url: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    let capacity = method.len() + url.len() + timestamp.len() + body.len() + 3;
    let mut message = Vec::with_capacity(capacity);
    message.extend_from_slice(method.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(url.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

fn mac_for(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::signing(format!("invalid HMAC key: {}", e)))
}

/// Hex-encoded HMAC-SHA256 of `message`
pub fn compute_signature(message: &[u8], secret: &str) -> Result<String> {
    let mut mac = mac_for(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign one request's canonical message
pub fn sign(method: &str, url: &str, timestamp: &str, body: &[u8], secret: &str) -> Result<String> {
    compute_signature(&canonical_message(method, url, timestamp, body), secret)
}

/// Check `signature` against `message` in constant time.
///
/// A signature that is not valid hex never matches.
pub fn verify_signature(message: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = mac_for(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// Verify an inbound signed request. The timestamp is not checked for age.
pub fn verify_request(
    method: &str,
    url: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    secret: &str,
) -> bool {
    verify_signature(&canonical_message(method, url, timestamp, body), signature, secret)
}

/// Timestamp and signature to attach to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub timestamp: String,
    pub signature: String,
}

/// Signs outbound requests with a shared secret.
///
/// Without a secret every operation is a no-op and requests go out unsigned.
#[derive(Clone)]
pub struct RequestSigner {
    secret: Option<Arc<Zeroizing<String>>>,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    pub fn new(secret: Option<&str>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| Arc::new(Zeroizing::new(s.to_string()))),
            clock,
        }
    }

    pub fn from_auth(auth: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(auth.hmac_secret(), clock)
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Current time formatted for the timestamp header
    pub fn timestamp(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Compute headers for a request; `None` when signing is disabled
    pub fn signature_headers(
        &self,
        method: &str,
        url: &str,
        body: &[u8],
    ) -> Result<Option<SignatureHeaders>> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };

        // One clock read feeds both the message and the header
        let timestamp = self.timestamp();
        let signature = sign(method, url, &timestamp, body, secret.as_str())?;

        Ok(Some(SignatureHeaders {
            timestamp,
            signature,
        }))
    }

    /// Attach signature headers to a built request.
    ///
    /// Streaming bodies cannot be signed and yield `Error::Signing`.
    pub fn sign_request(&self, request: &mut reqwest::Request) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let body = match request.body() {
            None => &[][..],
            Some(body) => body
                .as_bytes()
                .ok_or_else(|| Error::signing("streaming request bodies cannot be signed"))?,
        };

        let headers =
            self.signature_headers(request.method().as_str(), request.url().as_str(), body)?;
        let Some(headers) = headers else {
            return Ok(());
        };

        trace!(
            "Signed {} {} at {}",
            request.method(),
            request.url(),
            headers.timestamp
        );

        let timestamp = header_value(&headers.timestamp)?;
        let signature = header_value(&headers.signature)?;
        let request_headers = request.headers_mut();
        request_headers.insert(header_name(TIMESTAMP_HEADER)?, timestamp);
        request_headers.insert(header_name(SIGNATURE_HEADER)?, signature);

        Ok(())
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::signing(format!("invalid header name {}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::signing(format!("invalid header value: {}", e)))
}

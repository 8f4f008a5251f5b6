//! Manifest/digest resolution with caller-driven cancellation

use crate::reference::is_digest;
use crate::transport::{ManifestDescriptor, RegistryTransport};
use crate::types::{ImageInfo, ImageReference};
use scangate_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Resolves image references to their manifest and config digests
#[derive(Clone)]
pub struct DigestResolver {
    transport: Arc<dyn RegistryTransport>,
    timeout: Option<Duration>,
}

impl DigestResolver {
    pub fn new(transport: Arc<dyn RegistryTransport>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Bound each resolution by a deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve `reference` via the transport.
    ///
    /// Returns promptly with `Error::Cancelled` when `cancel` fires or the
    /// deadline elapses; the in-flight fetch is dropped. Nothing is retried.
    #[instrument(skip(self, cancel), fields(transport = self.transport.name()))]
    pub async fn resolve(
        &self,
        reference: &ImageReference,
        cancel: &CancellationToken,
    ) -> Result<ImageInfo> {
        let label = reference.to_string();
        debug!("Resolving digests for {}", label);

        let fetch = self.transport.fetch_descriptor(reference);

        let descriptor = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Resolution of {} cancelled by caller", label);
                return Err(Error::cancelled(&label, "cancelled by caller"));
            }
            result = with_deadline(fetch, self.timeout) => match result {
                Some(result) => result?,
                None => {
                    warn!("Resolution of {} exceeded its deadline", label);
                    return Err(Error::cancelled(
                        &label,
                        format!("deadline of {:?} exceeded", self.timeout.unwrap_or_default()),
                    ));
                }
            },
        };

        image_info(reference, descriptor)
    }
}

async fn with_deadline<F: std::future::Future>(
    fut: F,
    timeout: Option<Duration>,
) -> Option<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Validate a descriptor and combine it with the reference it was fetched for
pub fn image_info(reference: &ImageReference, descriptor: ManifestDescriptor) -> Result<ImageInfo> {
    let label = reference.to_string();

    let manifest_digest = require_digest(&label, descriptor.manifest_digest, "manifest digest")?;
    let config_digest = require_digest(&label, descriptor.config_digest, "config digest")?;

    Ok(ImageInfo {
        config_digest,
        manifest_digest,
        registry: reference.registry.clone(),
        repository: reference.repository.clone(),
        tag: reference.tag.clone(),
    })
}

fn require_digest(label: &str, digest: Option<String>, what: &str) -> Result<String> {
    match digest {
        Some(d) if is_digest(&d) => Ok(d),
        Some(d) => Err(Error::integrity(label, format!("{} (malformed value '{}')", what, d))),
        None => Err(Error::integrity(label, what)),
    }
}

/// One-shot resolution without a deadline
pub async fn resolve_image_info(
    reference: &ImageReference,
    transport: Arc<dyn RegistryTransport>,
    cancel: &CancellationToken,
) -> Result<ImageInfo> {
    DigestResolver::new(transport).resolve(reference, cancel).await
}

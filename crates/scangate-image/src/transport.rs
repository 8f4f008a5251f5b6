//! Registry transport collaborator

use crate::types::ImageReference;
use async_trait::async_trait;
use scangate_core::Result;

/// Digests extracted from a registry manifest.
///
/// Either digest may be absent if the registry returned an incomplete
/// document; the resolver turns that into an integrity error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDescriptor {
    /// Digest of the (platform-specific) image manifest
    pub manifest_digest: Option<String>,
    /// Digest of the image config blob
    pub config_digest: Option<String>,
    /// Media type of the image manifest, when reported
    pub media_type: Option<String>,
}

/// Anything that can fetch a remote image's manifest descriptor.
///
/// Implementations own all network access and addressing rules for the
/// registry; dropping the returned future must abort the fetch.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetch manifest and config digests for `reference`
    async fn fetch_descriptor(&self, reference: &ImageReference) -> Result<ManifestDescriptor>;

    /// Transport name for log messages
    fn name(&self) -> &'static str;
}

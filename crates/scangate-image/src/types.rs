use scangate_core::RegistryMirrors;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container image reference with registry, repository, tag, and optional digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Registry hostname, possibly with a port (e.g., "gcr.io", "registry.io:5000")
    pub registry: String,
    /// Repository path without leading or trailing slashes (e.g., "library/python")
    pub repository: String,
    /// Tag, "latest" when the input carried none
    pub tag: String,
    /// Digest (e.g., "sha256:abc123..."), recorded separately from the tag
    pub digest: Option<String>,
}

impl ImageReference {
    /// The manifest reference to request: the digest when pinned, else the tag
    pub fn fetch_reference(&self) -> &str {
        self.digest.as_deref().unwrap_or(&self.tag)
    }

    /// Rewrite this reference to address `mirror` instead of its registry.
    ///
    /// A mirror may carry a path prefix (`mirror.internal/docker-remote`);
    /// the prefix is prepended to the repository so the mirror host serves
    /// `docker-remote/library/nginx`.
    pub fn with_registry_mirror(&self, mirror: &str) -> Self {
        let (host, prefix) = match mirror.split_once('/') {
            Some((host, prefix)) => (host, prefix.trim_matches('/')),
            None => (mirror, ""),
        };

        let repository = if prefix.is_empty() {
            self.repository.clone()
        } else {
            format!("{}/{}", prefix, self.repository)
        };

        Self {
            registry: host.to_string(),
            repository,
            tag: self.tag.clone(),
            digest: self.digest.clone(),
        }
    }

    /// Apply configured mirrors; unmapped registries return an identical copy
    pub fn mirrored(&self, mirrors: &RegistryMirrors) -> Self {
        let target = mirrors.resolve(&self.registry);
        if target == self.registry {
            self.clone()
        } else {
            self.with_registry_mirror(target)
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Resolved, externally verifiable identity of an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    /// Digest of the image config blob (sha256:...)
    pub config_digest: String,
    /// Digest of the image manifest (sha256:...)
    pub manifest_digest: String,
    /// Registry hostname the manifest was fetched from
    pub registry: String,
    /// Repository path on that registry
    pub repository: String,
    /// Tag (or "latest" if not specified)
    pub tag: String,
}

/// Image manifest from OCI registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: i32,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub config: Option<ManifestConfig>,
    #[serde(default)]
    pub layers: Vec<ManifestLayer>,
    /// Present when the document is a manifest list / OCI index
    #[serde(default)]
    pub manifests: Vec<IndexEntry>,
}

impl ImageManifest {
    /// Whether this document points at per-platform manifests
    pub fn is_index(&self) -> bool {
        !self.manifests.is_empty()
            || matches!(
                self.media_type.as_deref(),
                Some(MEDIA_TYPE_OCI_INDEX) | Some(MEDIA_TYPE_DOCKER_MANIFEST_LIST)
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestConfig {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    pub media_type: String,
    pub size: u64,
    pub digest: String,
}

/// Entry of a manifest list / OCI index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Platform information for multi-arch images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(default)]
    pub variant: Option<String>,
}

impl Platform {
    /// Parse `os/arch[/variant]`
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('/');
        let os = parts.next().filter(|p| !p.is_empty())?;
        let architecture = parts.next().filter(|p| !p.is_empty())?;
        let variant = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
            variant,
        })
    }

    /// Whether an index entry's platform satisfies this one.
    ///
    /// A requested variant must match exactly; an unrequested variant
    /// accepts any.
    pub fn matches(&self, other: &Platform) -> bool {
        self.os == other.os
            && self.architecture == other.architecture
            && match &self.variant {
                Some(v) => other.variant.as_deref() == Some(v.as_str()),
                None => true,
            }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

//! # scangate-image
//!
//! Container image handling for Scangate:
//! - Parsing free-form image references into registry, repository, tag and digest
//! - Registry mirror substitution on parsed references
//! - Fetching manifests over the OCI distribution API
//! - Resolving references to manifest and config digests with cancellation
//!
//! ## Example
//!
//! ```no_run
//! use scangate_image::{DigestResolver, HttpRegistryTransport, ImageReference};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> scangate_core::Result<()> {
//! let reference = ImageReference::parse("ghcr.io/org/app:v1.0.0")?;
//! let resolver = DigestResolver::new(Arc::new(HttpRegistryTransport::new()?));
//! let info = resolver.resolve(&reference, &CancellationToken::new()).await?;
//! println!("{} -> {}", reference, info.manifest_digest);
//! # Ok(())
//! # }
//! ```

pub mod reference;
pub mod registry;
pub mod resolver;
pub mod transport;
pub mod types;

pub use reference::{parse_image_reference, DEFAULT_REGISTRY, DEFAULT_TAG};
pub use registry::HttpRegistryTransport;
pub use resolver::{resolve_image_info, DigestResolver};
pub use transport::{ManifestDescriptor, RegistryTransport};
pub use types::{ImageInfo, ImageManifest, ImageReference, Platform};

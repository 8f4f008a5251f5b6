//! # scangate-aqua
//!
//! Scanning-service side of Scangate:
//! - HMAC-SHA256 request signing and inbound signature verification
//! - The registry name cache mapping registry hosts to canonical names
//! - Authenticated access to the service API and its registry listing
//! - [`ResolutionClient`], converting image references into scan targets
//!   and resolving their digests
//!
//! ## Example
//!
//! ```no_run
//! use scangate_aqua::ResolutionClient;
//! use scangate_core::ScangateConfig;
//!
//! # async fn example() -> scangate_core::Result<()> {
//! let client = ResolutionClient::from_config(ScangateConfig::from_env()?)?;
//! let target = client.convert_image_ref("gcr.io/project/image:v1.0.0").await?;
//! println!("{} {}:{}", target.registry_name, target.repository, target.tag);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod lookup;
pub mod signer;

pub use api::{AquaApi, AquaRegistryProvider};
pub use cache::{RegistryCacheEntry, RegistryNameCache, RegistryTable};
pub use client::{ResolutionClient, ResolutionClientBuilder, ScanTarget};
pub use lookup::{RegistryLookup, RegistryNameProvider, StaticRegistryTable};
pub use signer::{
    canonical_message, compute_signature, sign, verify_request, verify_signature, RequestSigner,
    SignatureHeaders, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

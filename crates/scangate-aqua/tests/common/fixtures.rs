//! Client builders and canned collaborators

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scangate_aqua::{ResolutionClient, StaticRegistryTable};
use scangate_core::{FixedClock, Result, ScangateConfig};
use scangate_image::{ImageReference, ManifestDescriptor, RegistryTransport};
use std::sync::Arc;

pub const TEST_SECRET: &str = "test-hmac-secret";
pub const TEST_TOKEN: &str = "test-api-token";

pub const MANIFEST_DIGEST: &str =
    "sha256:1111111111111111111111111111111111111111111111111111111111111111";
pub const CONFIG_DIGEST: &str =
    "sha256:2222222222222222222222222222222222222222222222222222222222222222";

/// Fixed instant used for signature timestamps
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap()
}

pub fn test_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(test_now()))
}

/// Transport answering every reference with the same digests
pub struct StaticTransport;

#[async_trait]
impl RegistryTransport for StaticTransport {
    async fn fetch_descriptor(&self, _reference: &ImageReference) -> Result<ManifestDescriptor> {
        Ok(ManifestDescriptor {
            manifest_digest: Some(MANIFEST_DIGEST.to_string()),
            config_digest: Some(CONFIG_DIGEST.to_string()),
            media_type: None,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Client whose registry names come from a fixed table
pub fn client_with_table(table: StaticRegistryTable) -> ResolutionClient {
    ResolutionClient::builder(ScangateConfig::default())
        .registry_provider(Arc::new(table))
        .transport(Arc::new(StaticTransport))
        .build()
        .expect("client should build")
}

/// Config pointing at a mock scanning service
pub fn service_config(base_url: &str, secret: Option<&str>) -> ScangateConfig {
    let mut config = ScangateConfig::default();
    config.aqua_url = base_url.to_string();
    config.auth.token = TEST_TOKEN.to_string();
    config.auth.hmac_secret = secret.map(str::to_string);
    config
}

/// Client backed by the mock service's registry listing
pub fn service_client(base_url: &str, secret: Option<&str>) -> ResolutionClient {
    ResolutionClient::builder(service_config(base_url, secret))
        .clock(test_clock())
        .transport(Arc::new(StaticTransport))
        .build()
        .expect("client should build")
}

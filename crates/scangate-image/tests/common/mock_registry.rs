//! Mock registry helpers
//!
//! Serve OCI distribution manifest endpoints from a wiremock server and
//! build transports/references pointed at it.

use scangate_core::config::RegistrySettings;
use scangate_image::{HttpRegistryTransport, ImageReference};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// Plain-HTTP transport suitable for a local mock server
pub fn test_transport() -> HttpRegistryTransport {
    let settings = RegistrySettings {
        plain_http: true,
        ..RegistrySettings::default()
    };
    HttpRegistryTransport::from_settings(&settings, Duration::from_secs(5))
        .expect("transport should build")
}

/// Reference to `team/app:v1` hosted on the mock server
pub fn test_reference(server: &MockServer) -> ImageReference {
    ImageReference {
        registry: server.address().to_string(),
        repository: TEST_REPOSITORY.to_string(),
        tag: TEST_TAG.to_string(),
        digest: None,
    }
}

/// Manifest path for `reference` under the test repository
pub fn manifest_path(reference: &str) -> String {
    format!("/v2/{}/manifests/{}", TEST_REPOSITORY, reference)
}

/// Single-platform image manifest body
pub fn image_manifest_json(config_digest: Option<&str>) -> String {
    let config = match config_digest {
        Some(digest) => serde_json::json!({
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "size": 1469,
            "digest": digest,
        }),
        None => serde_json::json!({
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "size": 1469,
        }),
    };

    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": OCI_MANIFEST,
        "config": config,
        "layers": [{
            "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
            "size": 3370706,
            "digest": "sha256:eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
        }],
    })
    .to_string()
}

/// Multi-platform index with amd64 and arm64 entries
pub fn index_json() -> String {
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": OCI_INDEX,
        "manifests": [
            {
                "mediaType": OCI_MANIFEST,
                "digest": ARM64_DIGEST,
                "size": 1024,
                "platform": { "os": "linux", "architecture": "arm64", "variant": "v8" },
            },
            {
                "mediaType": OCI_MANIFEST,
                "digest": AMD64_DIGEST,
                "size": 1024,
                "platform": { "os": "linux", "architecture": "amd64" },
            },
        ],
    })
    .to_string()
}

/// Serve `body` at the manifest endpoint for `reference`
pub async fn mock_manifest(
    server: &MockServer,
    reference: &str,
    body: String,
    digest_header: Option<&str>,
) {
    let mut response = ResponseTemplate::new(200).set_body_raw(body, OCI_MANIFEST);
    if let Some(digest) = digest_header {
        response = response.insert_header("docker-content-digest", digest);
    }

    Mock::given(method("GET"))
        .and(path(manifest_path(reference)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Serve a multi-platform index at the tag endpoint
pub async fn mock_index(server: &MockServer, reference: &str) {
    Mock::given(method("GET"))
        .and(path(manifest_path(reference)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(index_json(), OCI_INDEX)
                .insert_header("docker-content-digest", MANIFEST_DIGEST),
        )
        .mount(server)
        .await;
}

/// Answer every manifest request with `status`
pub async fn mock_manifest_status(server: &MockServer, reference: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(manifest_path(reference)))
        .respond_with(ResponseTemplate::new(status).set_body_string("{\"errors\":[]}"))
        .mount(server)
        .await;
}

//! Mock scanning service helpers

use scangate_aqua::{verify_request, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const REGISTRIES_ENDPOINT: &str = "/api/v2/registries";

/// Matches requests carrying a valid signature for `url` under `secret`
pub struct SignedWith {
    pub secret: String,
    pub url: String,
}

impl Match for SignedWith {
    fn matches(&self, request: &Request) -> bool {
        let header = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        match (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER)) {
            (Some(timestamp), Some(signature)) => verify_request(
                request.method.as_str(),
                &self.url,
                &timestamp,
                &request.body,
                &signature,
                &self.secret,
            ),
            _ => false,
        }
    }
}

/// Registry listing body in the service's format
pub fn registry_listing() -> serde_json::Value {
    serde_json::json!({
        "count": 3,
        "page": 1,
        "pagesize": 50,
        "result": [
            {
                "name": "Docker Hub",
                "type": "HUB",
                "url": "https://docker.io",
                "prefixes": ["docker.io", "index.docker.io"]
            },
            {
                "name": "GCR",
                "type": "GCR",
                "url": "https://gcr.io",
                "prefixes": []
            },
            {
                "name": "Artifactory Docker",
                "type": "API",
                "url": "https://mirror.internal",
                "prefixes": ["mirror.internal/docker-remote"]
            }
        ]
    })
}

/// Serve the registry listing to requests bearing the test token
pub async fn mock_registry_listing(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(REGISTRIES_ENDPOINT))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(registry_listing()))
        .mount(server)
        .await;
}

//! Authenticated HTTP access to the scanning service

use crate::lookup::RegistryNameProvider;
use crate::signer::RequestSigner;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use scangate_core::{normalize_hostname, AuthConfig, Clock, Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("scangate/", env!("CARGO_PKG_VERSION"));

/// Registry listing endpoint, relative to the service base URL
pub const REGISTRIES_PATH: &str = "api/v2/registries";

/// HTTP client for the scanning service.
///
/// Every request carries the API token as a bearer credential and, when a
/// secret is configured, HMAC signature headers.
#[derive(Debug)]
pub struct AquaApi {
    base_url: Option<Url>,
    auth: AuthConfig,
    signer: RequestSigner,
    http: reqwest::Client,
}

impl AquaApi {
    pub fn new(
        base_url: Option<&str>,
        auth: AuthConfig,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| {
                Url::parse(u).map_err(|e| Error::config(format!("invalid aqua_url '{}': {}", u, e)))
            })
            .transpose()?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        let signer = RequestSigner::from_auth(&auth, clock);

        Ok(Self {
            base_url,
            auth,
            signer,
            http,
        })
    }

    /// The configured API token
    pub fn token(&self) -> &str {
        &self.auth.token
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Absolute URL for `path` under the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| Error::config("aqua_url is not configured"))?;

        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| Error::config(format!("invalid endpoint '{}': {}", joined, e)))
    }

    /// Start a request to `path` with the bearer token attached
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut builder = self.http.request(method, url);
        if !self.auth.token.is_empty() {
            builder = builder.bearer_auth(&self.auth.token);
        }
        Ok(builder)
    }

    /// Build and sign a request
    pub fn prepare(&self, builder: RequestBuilder) -> Result<reqwest::Request> {
        let mut request = builder
            .build()
            .map_err(|e| Error::signing(format!("failed to build request: {}", e)))?;
        self.signer.sign_request(&mut request)?;
        Ok(request)
    }

    /// Sign and send; non-success statuses become transport errors
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = self.prepare(builder)?;
        let label = format!("{} {}", request.method(), request.url());

        debug!("Sending {}", label);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| Error::transport(&label, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                &label,
                format!("service returned {}: {}", status, body.trim()),
            ));
        }

        Ok(response)
    }

    /// GET `path` and decode the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path)?;
        let label = format!("GET {}", path);
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::transport(&label, e))
    }
}

#[derive(Debug, Deserialize)]
struct RegistryList {
    #[serde(default)]
    result: Vec<RegistryRecord>,
}

#[derive(Debug, Deserialize)]
struct RegistryRecord {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    prefixes: Vec<String>,
}

/// Registry names fetched from the scanning service's registry listing.
///
/// Each registry is keyed by its URL host and by every declared prefix.
#[derive(Debug, Clone)]
pub struct AquaRegistryProvider {
    api: Arc<AquaApi>,
}

impl AquaRegistryProvider {
    pub fn new(api: Arc<AquaApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RegistryNameProvider for AquaRegistryProvider {
    async fn fetch_registry_names(&self) -> Result<HashMap<String, String>> {
        let list: RegistryList = self.api.get_json(REGISTRIES_PATH).await?;

        let mut names = HashMap::new();
        for record in list.result {
            let hosts = record.url.iter().chain(record.prefixes.iter());
            for host in hosts {
                let key = normalize_hostname(host);
                if key.is_empty() {
                    continue;
                }
                if let Some(previous) = names.insert(key.clone(), record.name.clone()) {
                    if previous != record.name {
                        warn!(
                            "Registry host {} claimed by both '{}' and '{}', using the latter",
                            key, previous, record.name
                        );
                    }
                }
            }
        }

        Ok(names)
    }

    fn name(&self) -> &'static str {
        "aqua"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scangate_core::SystemClock;

    fn api(base: Option<&str>) -> AquaApi {
        AquaApi::new(
            base,
            AuthConfig::new("token"),
            Arc::new(SystemClock),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = api(Some("https://aqua.example.com/tenant/"));
        assert_eq!(
            api.endpoint("/api/v2/registries").unwrap().as_str(),
            "https://aqua.example.com/tenant/api/v2/registries"
        );
    }

    #[test]
    fn test_missing_base_url_is_config_error() {
        let api = api(None);
        assert!(matches!(
            api.endpoint(REGISTRIES_PATH),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = AquaApi::new(
            Some("not a url"),
            AuthConfig::default(),
            Arc::new(SystemClock),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_prepare_attaches_bearer_token() {
        let api = api(Some("https://aqua.example.com"));
        let request = api
            .prepare(api.request(Method::GET, REGISTRIES_PATH).unwrap())
            .unwrap();

        assert_eq!(request.headers()["authorization"], "Bearer token");
        assert!(request.headers().get("x-aqua-signature").is_none());
    }
}

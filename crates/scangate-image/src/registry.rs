use crate::transport::{ManifestDescriptor, RegistryTransport};
use crate::types::{ImageManifest, ImageReference, IndexEntry, Platform};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode};
use scangate_core::config::RegistrySettings;
use scangate_core::{Error, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, trace};

const DOCKER_HUB_REGISTRY: &str = "docker.io";
const DOCKER_HUB_ENDPOINT: &str = "registry-1.docker.io";

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json,\
application/vnd.docker.distribution.manifest.v2+json,\
application/vnd.oci.image.index.v1+json,\
application/vnd.docker.distribution.manifest.list.v2+json";

const USER_AGENT: &str = concat!("scangate/", env!("CARGO_PKG_VERSION"));

/// Registry transport speaking the OCI distribution API over HTTP(S)
pub struct HttpRegistryTransport {
    client: reqwest::Client,
    plain_http: bool,
    platform: Platform,
    /// Token sent before any challenge (pre-issued registry tokens)
    static_token: Option<String>,
    /// Bearer tokens obtained from registry auth endpoints, keyed by endpoint and scope
    bearer_tokens: RwLock<HashMap<String, String>>,
}

impl HttpRegistryTransport {
    /// Create a transport with default settings (HTTPS, linux/amd64, 30s timeout)
    pub fn new() -> Result<Self> {
        Self::from_settings(&RegistrySettings::default(), Duration::from_secs(30))
    }

    /// Create a transport from configuration
    pub fn from_settings(settings: &RegistrySettings, timeout: Duration) -> Result<Self> {
        let platform = Platform::parse(&settings.platform).ok_or_else(|| {
            Error::config(format!(
                "invalid platform '{}': expected os/arch[/variant]",
                settings.platform
            ))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            plain_http: settings.plain_http,
            platform,
            static_token: None,
            bearer_tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Send a pre-issued bearer token on every request until a challenge replaces it
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.static_token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }

    /// Platform selected from manifest lists
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    fn scheme(&self) -> &'static str {
        if self.plain_http {
            "http"
        } else {
            "https"
        }
    }

    /// Fetch and decode one manifest document
    async fn get_manifest(
        &self,
        label: &str,
        endpoint: &str,
        repository: &str,
        reference: &str,
    ) -> Result<FetchedManifest> {
        let url = format!(
            "{}://{}/v2/{}/manifests/{}",
            self.scheme(),
            endpoint,
            repository,
            reference
        );

        debug!("Fetching manifest from: {}", url);

        let response = self.send_authorized(label, &url, endpoint, repository).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transport(
                label,
                format!(
                    "registry returned {} for {}: {}",
                    status,
                    url,
                    if body.is_empty() {
                        "(no response body)".to_string()
                    } else {
                        body
                    }
                ),
            ));
        }

        let header_digest = header_str(&response, "docker-content-digest");
        let content_type = header_str(&response, CONTENT_TYPE.as_str());

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(label, e))?;

        let manifest: ImageManifest =
            serde_json::from_slice(&body).map_err(|e| Error::transport(label, e))?;

        let digest = header_digest.unwrap_or_else(|| compute_digest(&body));
        let media_type = manifest.media_type.clone().or(content_type);

        trace!("Manifest {} has digest {}", url, digest);

        Ok(FetchedManifest {
            manifest,
            digest,
            media_type,
        })
    }

    /// GET `url`, answering a bearer challenge once if the registry issues one
    async fn send_authorized(
        &self,
        label: &str,
        url: &str,
        endpoint: &str,
        repository: &str,
    ) -> Result<Response> {
        let scope = format!("repository:{}:pull", repository);
        let cache_key = format!("{}|{}", endpoint, scope);

        let cached = self
            .bearer_tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
            .cloned()
            .or_else(|| self.static_token.clone());

        let response = self
            .get(url, cached.as_deref())
            .await
            .map_err(|e| Error::transport(label, e))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse);

        let Some(challenge) = challenge else {
            return Ok(response);
        };

        debug!("Registry {} requested a bearer token", endpoint);

        let token = self.fetch_bearer_token(label, &challenge, &scope).await?;
        self.bearer_tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key, token.clone());

        self.get(url, Some(&token))
            .await
            .map_err(|e| Error::transport(label, e))
    }

    async fn get(&self, url: &str, token: Option<&str>) -> reqwest::Result<Response> {
        let mut request = self.client.get(url).header(ACCEPT, MANIFEST_ACCEPT);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    /// Exchange for a bearer token at the challenge's realm
    async fn fetch_bearer_token(
        &self,
        label: &str,
        challenge: &BearerChallenge,
        scope: &str,
    ) -> Result<String> {
        let mut token_url =
            url::Url::parse(&challenge.realm).map_err(|e| Error::transport(label, e))?;
        {
            let mut pairs = token_url.query_pairs_mut();
            if let Some(service) = &challenge.service {
                pairs.append_pair("service", service);
            }
            pairs.append_pair("scope", challenge.scope.as_deref().unwrap_or(scope));
        }

        debug!("Requesting registry token from: {}", token_url);

        let response = self
            .client
            .get(token_url.as_str())
            .send()
            .await
            .map_err(|e| Error::transport(label, e))?;

        if !response.status().is_success() {
            return Err(Error::transport(
                label,
                format!("token request to {} failed ({})", challenge.realm, response.status()),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(label, e))?;

        token
            .token
            .or(token.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::transport(label, "token response carried no token"))
    }

    fn select_platform<'a>(&self, index: &'a ImageManifest) -> Option<&'a IndexEntry> {
        index.manifests.iter().find(|entry| {
            entry
                .platform
                .as_ref()
                .is_some_and(|p| self.platform.matches(p))
        })
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    async fn fetch_descriptor(&self, reference: &ImageReference) -> Result<ManifestDescriptor> {
        let label = reference.to_string();
        let endpoint = registry_endpoint(&reference.registry);
        let repository = repository_path(&reference.registry, &reference.repository);

        let top = self
            .get_manifest(&label, endpoint, &repository, reference.fetch_reference())
            .await?;

        let image = if top.manifest.is_index() {
            let entry = self.select_platform(&top.manifest).ok_or_else(|| {
                Error::integrity(&label, format!("manifest for platform {}", self.platform))
            })?;
            debug!(
                "Selected {} manifest {} from index {}",
                self.platform, entry.digest, top.digest
            );
            self.get_manifest(&label, endpoint, &repository, &entry.digest)
                .await?
        } else {
            top
        };

        Ok(ManifestDescriptor {
            manifest_digest: Some(image.digest),
            config_digest: image.manifest.config.and_then(|c| c.digest),
            media_type: image.media_type,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

struct FetchedManifest {
    manifest: ImageManifest,
    digest: String,
    media_type: Option<String>,
}

/// Network endpoint serving `registry`
pub fn registry_endpoint(registry: &str) -> &str {
    if registry == DOCKER_HUB_REGISTRY || registry == "index.docker.io" {
        DOCKER_HUB_ENDPOINT
    } else {
        registry
    }
}

/// Repository path as the registry expects it (Docker Hub official images live under `library/`)
pub fn repository_path(registry: &str, repository: &str) -> String {
    if registry_endpoint(registry) == DOCKER_HUB_ENDPOINT && !repository.contains('/') {
        format!("library/{}", repository)
    } else {
        repository.to_string()
    }
}

/// sha256 content digest in OCI form
pub fn compute_digest(content: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content)))
}

fn header_str(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Parsed `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut params = parse_auth_params(params);
        Some(Self {
            realm: params.remove("realm")?,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }
}

/// Parse `key="value", key=value` auth parameters; quoted values may contain commas
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while let Some((key, after)) = rest.split_once('=') {
        let key = key.trim().to_ascii_lowercase();
        let after = after.trim_start();

        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };

        params.insert(key, value.trim().to_string());
        rest = remainder.trim_start().trim_start_matches(',').trim_start();
    }

    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

//! Resolution client
//!
//! Composes mirror substitution, reference parsing, the registry name cache
//! and digest resolution behind the two operations the admission layer
//! consumes: [`ResolutionClient::convert_image_ref`] and
//! [`ResolutionClient::resolve_image_info`].

use crate::api::{AquaApi, AquaRegistryProvider};
use crate::cache::RegistryNameCache;
use crate::lookup::RegistryNameProvider;
use reqwest::{Method, RequestBuilder, Response};
use scangate_core::{Clock, Error, RegistryMirrors, Result, ScangateConfig, SystemClock};
use scangate_image::{
    DigestResolver, HttpRegistryTransport, ImageInfo, ImageReference, RegistryTransport,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// An image expressed in the scanning service's terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanTarget {
    /// Canonical registry name known to the scanning service
    pub registry_name: String,
    /// Repository path within that registry
    pub repository: String,
    /// Tag ("latest" when the reference carried none)
    pub tag: String,
    /// Digest, when the reference pinned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Client resolving image references for the scanning service.
///
/// Owns its credentials, registry name cache and mirror table. Safe to share
/// across tasks behind an `Arc`.
pub struct ResolutionClient {
    api: Arc<AquaApi>,
    mirrors: RegistryMirrors,
    cache: Arc<RegistryNameCache>,
    provider: Arc<dyn RegistryNameProvider>,
    resolver: DigestResolver,
    refresh_interval: Duration,
}

impl ResolutionClient {
    pub fn builder(config: ScangateConfig) -> ResolutionClientBuilder {
        ResolutionClientBuilder::new(config)
    }

    /// Client with the HTTP registry transport and the service's registry listing
    pub fn from_config(config: ScangateConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Map a raw reference to the scanning service's registry name, repository and tag.
    ///
    /// The registry host is mirror-substituted before lookup, so mirrored
    /// registries must be known under the mirror's name. A `NotFound` from
    /// the cache is returned as-is.
    #[instrument(skip(self))]
    pub async fn convert_image_ref(&self, raw: &str) -> Result<ScanTarget> {
        let reference = ImageReference::parse(raw)?;
        let lookup_host = self.mirrors.resolve(&reference.registry);

        if lookup_host != reference.registry {
            debug!("Registry {} mirrored to {}", reference.registry, lookup_host);
        }

        self.ensure_registry_names().await?;
        let registry_name = self.cache.lookup(lookup_host)?;

        Ok(ScanTarget {
            registry_name,
            repository: reference.repository,
            tag: reference.tag,
            digest: reference.digest,
        })
    }

    /// Resolve a raw reference to its manifest and config digests.
    ///
    /// The manifest is fetched from the mirror when one is configured for
    /// the reference's registry.
    #[instrument(skip(self, cancel))]
    pub async fn resolve_image_info(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<ImageInfo> {
        let reference = ImageReference::parse(raw)?.mirrored(&self.mirrors);
        self.resolver.resolve(&reference, cancel).await
    }

    /// Refresh the registry name cache now
    pub async fn refresh_registries(&self) -> Result<usize> {
        self.cache.refresh(self.provider.as_ref()).await
    }

    /// Refresh on a fixed interval until `cancel` fires.
    ///
    /// The first refresh runs immediately. Failures are logged by the cache
    /// and leave the current entries in place.
    pub fn spawn_registry_refresh(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let period = self.refresh_interval.max(MIN_REFRESH_INTERVAL);

        tokio::spawn(async move {
            info!("Registry refresh loop started (every {:?})", period);

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = client.refresh_registries().await {
                            debug!("Scheduled registry refresh failed: {}", e);
                        }
                    }
                }
            }

            info!("Registry refresh loop stopped");
        })
    }

    /// Populate the cache if it is empty or older than the refresh interval.
    ///
    /// A failed refresh over existing entries falls back to those entries.
    async fn ensure_registry_names(&self) -> Result<()> {
        match self
            .cache
            .refresh_if_stale(self.provider.as_ref(), self.refresh_interval)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if self.cache.is_populated() => {
                debug!("Continuing with stale registry names: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The scanning service API token
    pub fn token(&self) -> &str {
        self.api.token()
    }

    /// Start an authorized request to a scanning service path
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        self.api.request(method, path)
    }

    /// Build and sign a request without sending it
    pub fn prepare_request(&self, builder: RequestBuilder) -> Result<reqwest::Request> {
        self.api.prepare(builder)
    }

    /// Sign and send a request
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.api.send(builder).await
    }

    pub fn cache(&self) -> &Arc<RegistryNameCache> {
        &self.cache
    }

    pub fn mirrors(&self) -> &RegistryMirrors {
        &self.mirrors
    }
}

impl std::fmt::Debug for ResolutionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionClient")
            .field("api", &self.api)
            .field("mirrors", &self.mirrors)
            .field("cache", &self.cache)
            .field("provider", &self.provider.name())
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

/// Builder for [`ResolutionClient`]; collaborators default to the HTTP implementations
pub struct ResolutionClientBuilder {
    config: ScangateConfig,
    clock: Arc<dyn Clock>,
    provider: Option<Arc<dyn RegistryNameProvider>>,
    transport: Option<Arc<dyn RegistryTransport>>,
}

impl ResolutionClientBuilder {
    fn new(config: ScangateConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            provider: None,
            transport: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Source the registry name table from `provider` instead of the service
    pub fn registry_provider(mut self, provider: Arc<dyn RegistryNameProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Fetch manifests through `transport` instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn RegistryTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<ResolutionClient> {
        let config = self.config;
        let mirrors = RegistryMirrors::parse(&config.registry_mirrors)?;

        let api = Arc::new(AquaApi::new(
            Some(&config.aqua_url),
            config.auth.clone(),
            Arc::clone(&self.clock),
            config.timeout(),
        )?);

        let provider: Arc<dyn RegistryNameProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                if api.base_url().is_none() {
                    return Err(Error::config(
                        "aqua_url is required unless a registry name provider is supplied",
                    ));
                }
                Arc::new(AquaRegistryProvider::new(Arc::clone(&api)))
            }
        };

        let transport: Arc<dyn RegistryTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpRegistryTransport::from_settings(
                &config.registry,
                config.timeout(),
            )?),
        };

        debug!(
            "Resolution client: {} mirror(s), registry names from {}, manifests via {}",
            mirrors.len(),
            provider.name(),
            transport.name()
        );

        Ok(ResolutionClient {
            api,
            mirrors,
            cache: Arc::new(RegistryNameCache::with_clock(self.clock)),
            provider,
            resolver: DigestResolver::new(transport).with_timeout(config.timeout()),
            refresh_interval: config.registry_refresh_interval(),
        })
    }
}

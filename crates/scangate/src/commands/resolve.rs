//! Resolve command

use crate::cli::ResolveArgs;
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use scangate_aqua::{ResolutionClient, StaticRegistryTable};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(args: ResolveArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(platform) = args.platform {
        config.registry.platform = platform;
    }
    if args.plain_http {
        config.registry.plain_http = true;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout.max(1);
    }

    // Digest resolution never consults registry names
    let client = ResolutionClient::builder(config)
        .registry_provider(Arc::new(StaticRegistryTable::new()))
        .build()
        .context("Failed to create resolution client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling resolution");
            on_interrupt.cancel();
        }
    });

    info!("Resolving {}", args.reference);

    let info = client
        .resolve_image_info(&args.reference, &cancel)
        .await
        .with_context(|| format!("Cannot resolve '{}'", args.reference))?;

    if args.json {
        return output::json(&info);
    }

    output::header(&args.reference);
    output::kv("Registry", &info.registry);
    output::kv("Repository", &info.repository);
    output::kv("Tag", &info.tag);
    output::kv("Manifest digest", &info.manifest_digest);
    output::kv("Config digest", &info.config_digest);

    Ok(())
}

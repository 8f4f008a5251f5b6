//! Convert command

use crate::cli::ConvertArgs;
use crate::output;
use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use scangate_aqua::{ResolutionClient, StaticRegistryTable};
use std::sync::Arc;
use tracing::debug;

pub async fn run(args: ConvertArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;

    let mut builder = ResolutionClient::builder(config);
    if !args.registries.is_empty() {
        let table = parse_registry_entries(&args.registries)?;
        debug!("Using {} static registry entries", table.len());
        builder = builder.registry_provider(Arc::new(table));
    }
    let client = builder.build().context("Failed to create resolution client")?;

    let target = client
        .convert_image_ref(&args.reference)
        .await
        .with_context(|| format!("Cannot convert '{}'", args.reference))?;

    if args.json {
        return output::json(&target);
    }

    output::header(&args.reference);
    output::kv("Registry", &target.registry_name);
    output::kv("Image", &target.repository);
    output::kv("Tag", &target.tag);
    if let Some(digest) = &target.digest {
        output::kv("Digest", digest);
    }

    Ok(())
}

/// Parse repeated `HOST=NAME` flags into a static table
fn parse_registry_entries(entries: &[String]) -> Result<StaticRegistryTable> {
    let mut table = StaticRegistryTable::new();
    for entry in entries {
        let (host, name) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid registry entry '{}': expected HOST=NAME", entry))?;
        let (host, name) = (host.trim(), name.trim());
        if host.is_empty() || name.is_empty() {
            return Err(anyhow!("Invalid registry entry '{}': expected HOST=NAME", entry));
        }
        table.insert(host, name);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scangate_aqua::RegistryLookup;

    #[test]
    fn test_parse_registry_entries() {
        let table = parse_registry_entries(&[
            "docker.io=Docker Hub".to_string(),
            " https://gcr.io = GCR ".to_string(),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.registry_name("docker.io").unwrap(), "Docker Hub");
        assert_eq!(table.registry_name("gcr.io").unwrap(), "GCR");
    }

    #[test]
    fn test_parse_registry_entries_rejects_malformed() {
        assert!(parse_registry_entries(&["docker.io".to_string()]).is_err());
        assert!(parse_registry_entries(&["=Docker Hub".to_string()]).is_err());
        assert!(parse_registry_entries(&["docker.io=".to_string()]).is_err());
    }
}

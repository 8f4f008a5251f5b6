//! Registry mirror configuration
//!
//! Operators configure mirrors as a single comma-separated string of
//! `source=mirror` pairs, e.g.
//! `docker.io=mirror.internal/docker-remote,gcr.io=mirror.internal/gcr-remote`.
//! Resolution is an exact hostname match; unknown hosts pass through.

use crate::error::{Error, Result};
use crate::types::normalize_hostname;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A single `source=mirror` substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMapping {
    /// Registry host being replaced (e.g., "docker.io")
    pub source: String,
    /// Host (optionally with a path prefix) serving the same content
    pub mirror: String,
}

/// Ordered set of mirror mappings with unique sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryMirrors {
    mappings: Vec<MirrorMapping>,
}

impl RegistryMirrors {
    /// Parse an operator-supplied mirror specification.
    ///
    /// An empty (or all-whitespace) specification yields no mirrors.
    /// Entries missing `=`, with an empty side, with a duplicate source, or
    /// whose mirror is itself a configured source fail with a config error.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut mappings: Vec<MirrorMapping> = Vec::new();

        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (source, mirror) = entry.split_once('=').ok_or_else(|| {
                Error::config(format!(
                    "invalid registry mirror entry '{}': expected source=mirror",
                    entry
                ))
            })?;

            let source = normalize_hostname(source);
            let mirror = normalize_hostname(mirror);

            if source.is_empty() {
                return Err(Error::config(format!(
                    "invalid registry mirror entry '{}': empty source registry",
                    entry
                )));
            }
            if mirror.is_empty() {
                return Err(Error::config(format!(
                    "invalid registry mirror entry '{}': empty mirror registry",
                    entry
                )));
            }
            if mappings.iter().any(|m| m.source == source) {
                return Err(Error::config(format!(
                    "duplicate registry mirror for source '{}'",
                    source
                )));
            }

            trace!("Parsed registry mirror {} -> {}", source, mirror);
            mappings.push(MirrorMapping { source, mirror });
        }

        // A chain (a=b, b=c) would make resolution order-dependent
        for mapping in &mappings {
            if mappings.iter().any(|m| m.source == mapping.mirror) {
                return Err(Error::config(format!(
                    "registry mirror '{}' for '{}' is itself mirrored; chained mirrors are not supported",
                    mapping.mirror, mapping.source
                )));
            }
        }

        Ok(Self { mappings })
    }

    /// Build from already-validated mappings
    pub fn from_mappings(mappings: Vec<MirrorMapping>) -> Result<Self> {
        let spec = mappings
            .iter()
            .map(|m| format!("{}={}", m.source, m.mirror))
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&spec)
    }

    /// Return the mirror for `host`, or `host` unchanged when unmapped
    pub fn resolve<'a>(&'a self, host: &'a str) -> &'a str {
        let key = normalize_hostname(host);
        match self.mappings.iter().find(|m| m.source == key) {
            Some(mapping) => {
                trace!("Registry {} mirrored to {}", host, mapping.mirror);
                &mapping.mirror
            }
            None => host,
        }
    }

    pub fn mappings(&self) -> &[MirrorMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Parse a mirror specification into its ordered mappings
pub fn parse_mirrors(spec: &str) -> Result<Vec<MirrorMapping>> {
    RegistryMirrors::parse(spec).map(|m| m.mappings)
}

/// Resolve `host` against a list of mappings (exact match)
pub fn resolve_mirror(host: &str, mappings: &[MirrorMapping]) -> String {
    let key = normalize_hostname(host);
    mappings
        .iter()
        .find(|m| m.source == key)
        .map(|m| m.mirror.clone())
        .unwrap_or_else(|| host.to_string())
}

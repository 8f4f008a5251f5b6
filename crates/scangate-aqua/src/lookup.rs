//! Registry name capabilities
//!
//! `RegistryLookup` answers "what does the scanning service call this
//! registry host?"; `RegistryNameProvider` supplies the whole table when the
//! cache refreshes. `StaticRegistryTable` implements both for tests and
//! fixed deployments.

use async_trait::async_trait;
use scangate_core::{normalize_hostname, Error, Result};
use std::collections::HashMap;

/// Resolve a registry hostname to its canonical name
pub trait RegistryLookup: Send + Sync {
    /// Canonical name for `hostname`, or `Error::NotFound`.
    ///
    /// Implementations normalize the hostname before comparing.
    fn registry_name(&self, hostname: &str) -> Result<String>;
}

/// Source of the hostname to canonical-name table
#[async_trait]
pub trait RegistryNameProvider: Send + Sync {
    /// Fetch the full table. Keys need not be normalized.
    async fn fetch_registry_names(&self) -> Result<HashMap<String, String>>;

    /// Provider name for log messages
    fn name(&self) -> &'static str;
}

/// Fixed hostname table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegistryTable {
    entries: HashMap<String, String>,
}

impl StaticRegistryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping; the hostname is normalized
    pub fn insert(&mut self, hostname: &str, canonical_name: impl Into<String>) {
        self.entries
            .insert(normalize_hostname(hostname), canonical_name.into());
    }

    pub fn with(mut self, hostname: &str, canonical_name: impl Into<String>) -> Self {
        self.insert(hostname, canonical_name);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for StaticRegistryTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (hostname, name) in iter {
            table.insert(hostname.as_ref(), name);
        }
        table
    }
}

impl RegistryLookup for StaticRegistryTable {
    fn registry_name(&self, hostname: &str) -> Result<String> {
        let key = normalize_hostname(hostname);
        self.entries
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }
}

#[async_trait]
impl RegistryNameProvider for StaticRegistryTable {
    async fn fetch_registry_names(&self) -> Result<HashMap<String, String>> {
        Ok(self.entries.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup_normalizes() {
        let table = StaticRegistryTable::new().with("https://GCR.io/", "GCR");

        assert_eq!(table.registry_name("gcr.io").unwrap(), "GCR");
        assert_eq!(table.registry_name("http://gcr.io").unwrap(), "GCR");
    }

    #[test]
    fn test_static_lookup_not_found() {
        let table = StaticRegistryTable::new();
        let err = table.registry_name("https://quay.io").unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("quay.io"));
        assert!(!err.to_string().contains("https://"));
    }

    #[tokio::test]
    async fn test_static_provider_returns_table() {
        let table: StaticRegistryTable =
            [("docker.io", "Docker Hub"), ("gcr.io", "GCR")].into_iter().collect();

        let names = table.fetch_registry_names().await.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names["docker.io"], "Docker Hub");
    }
}

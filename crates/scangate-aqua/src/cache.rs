//! Registry name cache
//!
//! Maps normalized registry hostnames to the scanning service's canonical
//! registry names. Readers clone an `Arc` to the current table under a
//! shared lock; a refresh fetches the new table with no lock held and then
//! swaps the `Arc` under the exclusive lock. Readers therefore see either
//! the whole old table or the whole new one.
//!
//! A failed refresh leaves the previous table in place. Once the cache holds
//! entries, on-demand refreshes never make a reader wait: a reader arriving
//! while another refresh is in flight keeps the current table, and a failed
//! attempt counts toward the refresh interval like a successful one.

use crate::lookup::{RegistryLookup, RegistryNameProvider};
use chrono::{DateTime, TimeDelta, Utc};
use scangate_core::{normalize_hostname, Clock, Error, Result, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One cached hostname mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCacheEntry {
    /// Normalized hostname (lowercase, no scheme)
    pub hostname: String,
    /// Name the scanning service uses for this registry
    pub canonical_name: String,
    /// When the table holding this entry was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Immutable snapshot of the cache contents
#[derive(Debug, Clone, Default)]
pub struct RegistryTable {
    entries: HashMap<String, RegistryCacheEntry>,
    fetched_at: Option<DateTime<Utc>>,
}

impl RegistryTable {
    /// Build a table from raw provider output, normalizing hostnames.
    /// Blank hostnames are dropped.
    pub fn from_names(names: HashMap<String, String>, fetched_at: DateTime<Utc>) -> Self {
        let entries = names
            .into_iter()
            .filter_map(|(hostname, canonical_name)| {
                let hostname = normalize_hostname(&hostname);
                if hostname.is_empty() {
                    return None;
                }
                Some((
                    hostname.clone(),
                    RegistryCacheEntry {
                        hostname,
                        canonical_name,
                        fetched_at,
                    },
                ))
            })
            .collect();

        Self {
            entries,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn get(&self, hostname: &str) -> Option<&RegistryCacheEntry> {
        self.entries.get(&normalize_hostname(hostname))
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryCacheEntry> {
        self.entries.values()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Concurrent hostname to canonical-name cache
pub struct RegistryNameCache {
    table: RwLock<Arc<RegistryTable>>,
    clock: Arc<dyn Clock>,
    /// Serializes refreshes so concurrent callers share one fetch
    refresh_lock: tokio::sync::Mutex<()>,
    /// Start of the most recent refresh, successful or not
    last_attempt: Mutex<Option<DateTime<Utc>>>,
}

impl RegistryNameCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(Arc::new(RegistryTable::default())),
            clock,
            refresh_lock: tokio::sync::Mutex::new(()),
            last_attempt: Mutex::new(None),
        }
    }

    /// Current table; cheap to call and never blocks on a fetch
    pub fn snapshot(&self) -> Arc<RegistryTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Canonical name for `hostname`, or `Error::NotFound`. Never refreshes.
    pub fn lookup(&self, hostname: &str) -> Result<String> {
        let key = normalize_hostname(hostname);
        self.snapshot()
            .entries
            .get(&key)
            .map(|entry| entry.canonical_name.clone())
            .ok_or_else(|| Error::not_found(key))
    }

    /// Install a freshly fetched table, stamped with the current time
    pub fn replace(&self, names: HashMap<String, String>) -> usize {
        let table = Arc::new(RegistryTable::from_names(names, self.clock.now()));
        let count = table.len();
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
        count
    }

    /// Fetch from `provider` and swap in the result.
    ///
    /// On failure the existing entries stay in place and the error is returned.
    pub async fn refresh(&self, provider: &dyn RegistryNameProvider) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(provider).await
    }

    /// Refresh if no attempt was made within `max_age`, or the cache was never populated.
    ///
    /// With entries present, a caller that finds a refresh already running
    /// returns at once and keeps using the current table. An unpopulated
    /// cache has nothing to serve, so callers wait and retry.
    ///
    /// Returns whether this call refreshed the table.
    pub async fn refresh_if_stale(
        &self,
        provider: &dyn RegistryNameProvider,
        max_age: Duration,
    ) -> Result<bool> {
        if !self.refresh_due(max_age) {
            return Ok(false);
        }

        let _guard = if self.is_populated() {
            match self.refresh_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Registry refresh already in flight, serving cached entries");
                    return Ok(false);
                }
            }
        } else {
            self.refresh_lock.lock().await
        };

        // Another caller may have refreshed, or tried to, while we waited
        if !self.refresh_due(max_age) {
            return Ok(false);
        }

        self.refresh_locked(provider).await.map(|_| true)
    }

    async fn refresh_locked(&self, provider: &dyn RegistryNameProvider) -> Result<usize> {
        debug!("Refreshing registry names from {}", provider.name());
        *self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.clock.now());

        match provider.fetch_registry_names().await {
            Ok(names) => {
                let count = self.replace(names);
                info!("Registry name cache refreshed: {} entries", count);
                Ok(count)
            }
            Err(e) => {
                warn!(
                    "Registry name refresh from {} failed, keeping {} cached entries: {}",
                    provider.name(),
                    self.len(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Time of the last successful population
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.snapshot().fetched_at
    }

    /// Start of the most recent refresh attempt, successful or not
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        *self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_populated(&self) -> bool {
        self.last_refreshed().is_some()
    }

    /// Whether the table is older than `max_age`; an unpopulated cache is stale
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.last_refreshed() {
            Some(fetched_at) => self.older_than(fetched_at, max_age),
            None => true,
        }
    }

    /// Whether an on-demand refresh should run. Failed attempts reset the
    /// interval once entries exist; an unpopulated cache is always due.
    fn refresh_due(&self, max_age: Duration) -> bool {
        let Some(fetched_at) = self.last_refreshed() else {
            return true;
        };
        let latest = self.last_attempt().map_or(fetched_at, |a| a.max(fetched_at));
        self.older_than(latest, max_age)
    }

    fn older_than(&self, at: DateTime<Utc>, max_age: Duration) -> bool {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        self.clock.now().signed_duration_since(at) >= max_age
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for RegistryNameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryLookup for RegistryNameCache {
    fn registry_name(&self, hostname: &str) -> Result<String> {
        self.lookup(hostname)
    }
}

impl std::fmt::Debug for RegistryNameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.snapshot();
        f.debug_struct("RegistryNameCache")
            .field("entries", &table.len())
            .field("fetched_at", &table.fetched_at)
            .finish()
    }
}

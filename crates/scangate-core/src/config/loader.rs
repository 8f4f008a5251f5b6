//! Configuration file loading and parsing
//!
//! Precedence (low to high):
//! 1. Built-in defaults
//! 2. scangate.yaml (explicit path, or searched upward from the cwd)
//! 3. Environment variables (AQUA_URL, AQUA_API_KEY, AQUA_HMAC_SECRET, REGISTRY_MIRRORS)

use crate::error::{Error, Result};
use crate::mirror::RegistryMirrors;
use crate::types::AuthConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["scangate.yaml", "scangate.yml"];

/// Platform selected from multi-arch manifest lists
pub const DEFAULT_PLATFORM: &str = "linux/amd64";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGISTRY_REFRESH_SECS: u64 = 3600;

/// Image registry transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Talk plain HTTP to registries (test and air-gapped setups only)
    #[serde(default)]
    pub plain_http: bool,

    /// `os/arch[/variant]` chosen from manifest lists
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            plain_http: false,
            platform: default_platform(),
        }
    }
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_registry_refresh_secs() -> u64 {
    DEFAULT_REGISTRY_REFRESH_SECS
}

/// Loaded and validated Scangate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScangateConfig {
    /// Scanning service base URL
    #[serde(default)]
    pub aqua_url: String,

    /// Scanning service credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Comma-separated `source=mirror` pairs
    #[serde(default)]
    pub registry_mirrors: String,

    /// Per-request timeout for outbound calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum age of the registry name table before an on-demand refresh
    #[serde(default = "default_registry_refresh_secs")]
    pub registry_refresh_secs: u64,

    /// Image registry transport settings
    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(skip)]
    mirrors: RegistryMirrors,
}

impl Default for ScangateConfig {
    fn default() -> Self {
        Self {
            aqua_url: String::new(),
            auth: AuthConfig::default(),
            registry_mirrors: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            registry_refresh_secs: DEFAULT_REGISTRY_REFRESH_SECS,
            registry: RegistrySettings::default(),
            mirrors: RegistryMirrors::default(),
        }
    }
}

impl ScangateConfig {
    /// Load configuration from the specified path or search for it,
    /// then layer environment overrides on top
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let (config_path, content) = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config(format!("configuration file not found: {}", p))
                    } else {
                        Error::Io(e)
                    }
                })?;
                (p.to_owned(), content)
            }
            None => Self::find_config()?,
        };

        debug!("Loading configuration from {}", config_path);

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load a file config if one exists, otherwise fall back to the environment
    pub fn load_or_env(path: Option<&Utf8Path>) -> Result<Self> {
        match path {
            Some(_) => Self::load(path),
            None => match Self::find_config() {
                Ok((config_path, content)) => {
                    debug!("Loading configuration from {}", config_path);
                    let mut config = Self::from_yaml(&content)?;
                    config.apply_env_overrides()?;
                    Ok(config)
                }
                Err(Error::Config { .. }) => Self::from_env(),
                Err(e) => Err(e),
            },
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: ScangateConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides and re-validate
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("AQUA_URL") {
            self.aqua_url = val;
        }

        if let Some(val) = lookup("AQUA_API_KEY") {
            self.auth.token = val;
        }

        if let Some(val) = lookup("AQUA_HMAC_SECRET") {
            self.auth.hmac_secret = Some(val);
        }

        if let Some(val) = lookup("REGISTRY_MIRRORS") {
            self.registry_mirrors = val;
        }

        if let Some(val) = lookup("SCANGATE_TIMEOUT_SECS") {
            self.timeout_secs = val.parse().map_err(|_| {
                Error::config("SCANGATE_TIMEOUT_SECS must be a valid number")
            })?;
        }

        self.validate()
    }

    /// Parse derived settings; malformed mirrors fail the whole load
    fn validate(&mut self) -> Result<()> {
        self.mirrors = RegistryMirrors::parse(&self.registry_mirrors)?;

        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }

        Ok(())
    }

    /// Find configuration file in current directory or parent directories
    fn find_config() -> Result<(Utf8PathBuf, String)> {
        let cwd = env::current_dir().map_err(Error::Io)?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::config("Current directory path is not valid UTF-8"))?;

        let mut current = cwd.as_path();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok((path, content));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::config(
            "scangate.yaml not found (searched current and parent directories)",
        ))
    }

    /// Parsed registry mirrors
    pub fn mirrors(&self) -> &RegistryMirrors {
        &self.mirrors
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Maximum registry table age before an on-demand refresh
    pub fn registry_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.registry_refresh_secs)
    }
}

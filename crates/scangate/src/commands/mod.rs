//! Command implementations

pub mod convert;
pub mod parse;
pub mod resolve;
pub mod sign;

use anyhow::{Context, Result};
use camino::Utf8Path;
use scangate_core::ScangateConfig;

/// Load the config file if present, otherwise build from the environment
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<ScangateConfig> {
    ScangateConfig::load_or_env(path).context("Failed to load configuration")
}

//! Configuration loading and management

mod loader;

pub use loader::{RegistrySettings, ScangateConfig, DEFAULT_PLATFORM};

//! # scangate-core
//!
//! Core library for Scangate providing:
//! - The error taxonomy shared by every Scangate crate
//! - Configuration file and environment loading (scangate.yaml)
//! - Registry mirror parsing and host substitution
//! - Authentication settings and hostname normalization
//! - An injectable clock for time-dependent components

pub mod clock;
pub mod config;
pub mod error;
pub mod mirror;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ScangateConfig;
pub use error::{Error, Result};
pub use mirror::{parse_mirrors, resolve_mirror, MirrorMapping, RegistryMirrors};
pub use types::{normalize_hostname, AuthConfig};

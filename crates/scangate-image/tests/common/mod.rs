//! Common test infrastructure for scangate-image tests
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Digests and repository names shared by tests
//! - `mock_registry`: Wiremock setup helpers for registry manifest endpoints

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod mock_registry;

pub use constants::*;
pub use mock_registry::*;

//! Common test infrastructure for scangate-aqua tests
//!
//! # Modules
//!
//! - `fixtures`: Client builders and canned collaborators
//! - `mock_service`: Wiremock helpers for the scanning service API

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mock_service;

pub use fixtures::*;
pub use mock_service::*;

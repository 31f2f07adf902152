//! # Namer Common Library
//!
//! Shared code for the namer lookup tooling:
//! - Error and result types
//! - TOML configuration loading and layered resolution
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod human_time;

pub use config::TomlConfig;
pub use error::{Error, Result};

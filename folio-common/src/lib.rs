//! # Folio Common Library
//!
//! Shared code for the folio workspace:
//! - Error type used by configuration and I/O helpers
//! - Configuration loading (TOML file, environment, compiled defaults)

pub mod config;
pub mod error;

pub use config::{LoaderSettings, LoggingConfig, TomlConfig};
pub use error::{Error, Result};

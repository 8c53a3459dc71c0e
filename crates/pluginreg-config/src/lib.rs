#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for pluginreg.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pluginreg_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("installing from {}", resolved.config.github.hostname);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed with `--config`
//! 2. **User** (`<config dir>/pluginreg/config.toml`)
//! 3. **Environment variables** (`PLUGINREG_*`, `GITHUB_TOKEN`), fallback only
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other pluginreg crate. Conversion into the
//! installer option types happens in the CLI.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::{ConfigLayer, FieldSources};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed, the
    /// explicit file cannot be read, or the final configuration fails
    /// validation.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }

    /// Directory plugins are installed under.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] when no directory is configured
    /// and the per-user data directory cannot be determined.
    pub fn plugin_dir(&self) -> ConfigResult<PathBuf> {
        match &self.install.plugin_dir {
            Some(dir) => Ok(dir.clone()),
            None => loader::default_plugin_dir(),
        }
    }
}

//! Core abstractions shared by every pluginreg installer.
//!
//! - [`Plugin`]: the plugin descriptor stored in [`METADATA_FILE`]
//! - [`decode_metadata`] / [`MetadataReader`]: the YAML metadata codec
//! - [`Fs`] / [`OsFs`]: the filesystem abstraction installers are bound to
//! - [`InstallContext`]: cancellation and filesystem handle threaded through an install
//! - [`Installer`] / [`InstallerRegistry`]: the installer capability and its
//!   predicate-based discovery
//!
//! # Registration
//!
//! Nothing registers itself. The application builds an [`InstallerRegistry`]
//! at startup and each source or format crate exposes a `register` function
//! that adds its (predicate, factory) pair:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pluginreg_core::{InstallContext, InstallerRegistry, OsFs};
//!
//! # async fn run(registry: InstallerRegistry) -> pluginreg_core::InstallResult<()> {
//! let ctx = InstallContext::new(Arc::new(OsFs::new()));
//! let plugin = registry
//!     .install(&ctx, std::path::Path::new("/opt/plugins"), "github.com/owner/my-plugin")
//!     .await?;
//! println!("installed {} {}", plugin.name, plugin.version);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod error;
pub mod fs;
pub mod installer;
pub mod metadata;
pub mod plugin;

pub use context::InstallContext;
pub use error::{InstallError, InstallResult};
pub use fs::{FileStat, Fs, OsFs};
pub use installer::{Installer, InstallerFactory, InstallerPredicate, InstallerRegistry};
pub use metadata::{
    MetadataError, MetadataReader, MetadataResult, decode_metadata, read_metadata_file,
    write_metadata_file,
};
pub use plugin::{Artifact, Artifacts, METADATA_FILE, Plugin, runtime_artifact_identifier};

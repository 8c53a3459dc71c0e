//! Local filesystem installers for pluginreg.
//!
//! Installs plugins from a directory, a zip archive, a gzip-compressed
//! tarball or a gzip-compressed single file. Every installer places the
//! plugin at `<dest>/<name>` where `<name>` comes from the plugin metadata,
//! either the `.plugin.registry.yaml` next to the source or the one at the
//! root of the unpacked tree.
//!
//! # Security
//!
//! Archives are extracted with path traversal protection, links and
//! special files are rejected, and entry counts and extracted sizes are
//! bounded.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod assemble;
pub mod directory;
pub mod gzip;
pub mod tarball;
pub mod zip_archive;

use std::sync::Arc;

use pluginreg_core::{Installer, InstallerRegistry};

pub use directory::DirectoryInstaller;
pub use gzip::GzipInstaller;
pub use tarball::TarballInstaller;
pub use zip_archive::ZipInstaller;

/// Maximum number of entries allowed in an archive.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total extracted size (500 MB).
const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

/// Mode applied to single-file executables.
const EXECUTABLE_MODE: u32 = 0o755;

/// Register the directory, zip, tarball and gzip installers, in that scan
/// order.
pub fn register(registry: &mut InstallerRegistry) {
    registry.register("dir", DirectoryInstaller::accepts, |fs| {
        Arc::new(DirectoryInstaller::new(fs)) as Arc<dyn Installer>
    });
    registry.register("zip", ZipInstaller::accepts, |fs| {
        Arc::new(ZipInstaller::new(fs)) as Arc<dyn Installer>
    });
    registry.register("tarball", TarballInstaller::accepts, |fs| {
        Arc::new(TarballInstaller::new(fs)) as Arc<dyn Installer>
    });
    registry.register("gzip", GzipInstaller::accepts, |fs| {
        Arc::new(GzipInstaller::new(fs)) as Arc<dyn Installer>
    });
}

#[cfg(test)]
mod tests {
    use pluginreg_core::{InstallContext, InstallError};

    use super::*;

    #[test]
    fn test_registers_in_scan_order() {
        let mut registry = InstallerRegistry::new();
        register(&mut registry);
        assert_eq!(registry.identifiers(), vec!["dir", "zip", "tarball", "gzip"]);
    }

    #[tokio::test]
    async fn test_registry_dispatches_directory_sources() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(
            src.path().join(pluginreg_core::METADATA_FILE),
            "name: from-dir\n",
        )
        .unwrap();
        let dest = tempfile::tempdir().unwrap();
        let mut registry = InstallerRegistry::new();
        register(&mut registry);

        let plugin = registry
            .install(
                &InstallContext::default(),
                dest.path(),
                src.path().to_str().unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(plugin.name, "from-dir");
        assert!(dest.path().join("from-dir").is_dir());
    }

    #[test]
    fn test_unknown_sources_are_unsupported() {
        let mut registry = InstallerRegistry::new();
        register(&mut registry);

        let err = registry
            .find(&InstallContext::default(), "/missing/plugin.7z")
            .err()
            .unwrap();
        assert!(matches!(err, InstallError::NoSupportedInstaller { .. }));
    }
}

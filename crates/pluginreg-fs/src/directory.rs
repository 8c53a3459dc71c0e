//! Installer for plugins laid out as a plain directory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pluginreg_core::{Fs, InstallContext, InstallError, InstallResult, Installer, Plugin};
use tokio_util::sync::CancellationToken;

use crate::assemble::{self, Assembly};

/// Copies a directory tree into `<dest>/<name>`, keeping file modes.
#[derive(Debug)]
pub struct DirectoryInstaller {
    fs: Arc<dyn Fs>,
}

impl DirectoryInstaller {
    /// Create an installer bound to `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self { fs }
    }

    /// Whether `source` is an existing directory.
    #[must_use]
    pub fn accepts(ctx: &InstallContext, source: &str) -> bool {
        ctx.fs()
            .stat(Path::new(source))
            .is_ok_and(|stat| stat.is_dir)
    }
}

#[async_trait]
impl Installer for DirectoryInstaller {
    async fn install(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        source: &str,
    ) -> InstallResult<Plugin> {
        let fs = Arc::clone(&self.fs);
        let dest = dest.to_path_buf();
        let source = Path::new(source).to_path_buf();

        assemble::run_blocking(ctx, move |token| {
            install_directory(&fs, &token, &dest, &source)
        })
        .await
    }
}

fn install_directory(
    fs: &Arc<dyn Fs>,
    token: &CancellationToken,
    dest: &Path,
    source: &Path,
) -> InstallResult<Plugin> {
    let assembly = Assembly::new(dest)?;
    copy_tree(token, source, assembly.payload())?;

    let plugin = assemble::root_metadata(source, assembly.payload())?;
    let root = assembly.payload().to_path_buf();
    assembly.commit(fs, dest, &root, &plugin)?;

    Ok(plugin)
}

fn copy_tree(token: &CancellationToken, from: &Path, to: &Path) -> InstallResult<()> {
    for entry in std::fs::read_dir(from)? {
        assemble::check_cancelled(token)?;

        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = to.join(entry.file_name());

        if file_type.is_dir() {
            std::fs::create_dir(&target)?;
            copy_tree(token, &entry.path(), &target)?;
        } else if file_type.is_file() {
            // std::fs::copy carries the permission bits over.
            std::fs::copy(entry.path(), &target)?;
        } else {
            return Err(InstallError::UnsafeEntryType {
                entry_type: "symlink".to_string(),
                path: entry.path().display().to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pluginreg_core::{METADATA_FILE, OsFs};

    use super::*;

    fn source_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            "name: my-plugin\nversion: 1.4.2\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/tool"), b"#!/bin/sh\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_copies_tree_under_plugin_name() {
        let source = source_dir();
        let dest = tempfile::tempdir().unwrap();
        let installer = DirectoryInstaller::new(Arc::new(OsFs::new()));

        let plugin = installer
            .install(
                &InstallContext::default(),
                dest.path(),
                source.path().to_str().unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(plugin.name, "my-plugin");
        assert_eq!(plugin.version, "1.4.2");
        let installed = dest.path().join("my-plugin");
        assert_eq!(
            std::fs::read(installed.join("bin/tool")).unwrap(),
            b"#!/bin/sh\n"
        );
        assert!(installed.join(METADATA_FILE).is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_keeps_file_modes() {
        use std::os::unix::fs::PermissionsExt;

        let source = source_dir();
        let tool = source.path().join("bin/tool");
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let dest = tempfile::tempdir().unwrap();
        let installer = DirectoryInstaller::new(Arc::new(OsFs::new()));

        installer
            .install(
                &InstallContext::default(),
                dest.path(),
                source.path().to_str().unwrap(),
            )
            .await
            .unwrap();

        let mode = std::fs::metadata(dest.path().join("my-plugin/bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_accepts_only_directories() {
        let source = source_dir();
        let ctx = InstallContext::default();

        assert!(DirectoryInstaller::accepts(
            &ctx,
            source.path().to_str().unwrap()
        ));
        assert!(!DirectoryInstaller::accepts(
            &ctx,
            source.path().join(METADATA_FILE).to_str().unwrap()
        ));
        assert!(!DirectoryInstaller::accepts(&ctx, "/does/not/exist"));
    }

    #[tokio::test]
    async fn test_directory_without_metadata_fails() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let installer = DirectoryInstaller::new(Arc::new(OsFs::new()));

        let err = installer
            .install(
                &InstallContext::default(),
                dest.path(),
                source.path().to_str().unwrap(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::MissingMetadata { .. }));
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}

//! Filesystem abstraction installers are bound to.
//!
//! Installers receive an `Arc<dyn Fs>` from the registry factory so that the
//! staging side effects (temp directories, artifact writes, permission
//! changes, cleanup) can be observed and faulted in tests. Operations are
//! path-scoped; an `Fs` holds no per-install state and may be shared.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Metadata returned by [`Fs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// True if the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes.
    pub len: u64,
    /// Permission bits (`0` on platforms without unix modes).
    pub mode: u32,
}

/// Path-scoped filesystem operations used while staging and installing.
pub trait Fs: Send + Sync + fmt::Debug {
    /// Create a fresh, uniquely named directory under the system temp
    /// directory whose name starts with `prefix`. Owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    fn create_temp_dir(&self, prefix: &str) -> io::Result<PathBuf>;

    /// Open `path` for reading and writing, creating it with `mode` if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>>;

    /// Set the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the permissions cannot be changed.
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Remove `path` and everything below it. Missing paths are not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if an existing entry cannot be removed.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Stat `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the path does not exist or cannot be read.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;
}

/// [`Fs`] backed by the host filesystem.
#[derive(Debug, Clone, Default)]
pub struct OsFs {
    temp_root: Option<PathBuf>,
}

impl OsFs {
    /// Create a host filesystem using the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self { temp_root: None }
    }

    /// Create temp directories under `root` instead of the system temp
    /// directory.
    #[must_use]
    pub fn with_temp_root(root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: Some(root.into()),
        }
    }
}

impl Fs for OsFs {
    fn create_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        let root = self.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
        Ok(dir.keep())
    }

    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let mut options = std::fs::OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(Box::new(options.open(path)?))
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            std::fs::metadata(path).map(|_| ())
        }
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = std::fs::metadata(path)?;

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o7777
        };
        #[cfg(not(unix))]
        let mode = 0;

        Ok(FileStat {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dirs_are_unique_and_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let fs = OsFs::with_temp_root(root.path());

        let a = fs.create_temp_dir("pluginreg-test-").unwrap();
        let b = fs.create_temp_dir("pluginreg-test-").unwrap();

        assert_ne!(a, b);
        assert!(a.is_dir());
        assert!(
            a.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("pluginreg-test-")
        );
    }

    #[test]
    fn test_open_file_creates_and_writes() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("artifact");
        let fs = OsFs::new();

        let mut file = fs.open_file(&path, 0o644).unwrap();
        file.write_all(b"payload").unwrap();
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert_eq!(fs.stat(&path).unwrap().len, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_chmod_sets_mode() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("bin");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        let fs = OsFs::new();

        fs.chmod(&path, 0o755).unwrap();
        assert_eq!(fs.stat(&path).unwrap().mode, 0o755);
    }

    #[test]
    fn test_remove_all_handles_dirs_files_and_missing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("a/b");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("f"), b"x").unwrap();
        let file = root.path().join("single");
        std::fs::write(&file, b"x").unwrap();
        let fs = OsFs::new();

        fs.remove_all(&root.path().join("a")).unwrap();
        fs.remove_all(&file).unwrap();
        fs.remove_all(&root.path().join("missing")).unwrap();

        assert!(!root.path().join("a").exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_stat_reports_directories() {
        let root = tempfile::tempdir().unwrap();
        let stat = OsFs::new().stat(root.path()).unwrap();
        assert!(stat.is_dir);
        assert!(OsFs::new().stat(&root.path().join("nope")).is_err());
    }
}

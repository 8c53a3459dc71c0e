//! Installer for zip archives.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pluginreg_core::{Fs, InstallContext, InstallError, InstallResult, Installer, Plugin};
use tokio_util::sync::CancellationToken;
use zip::ZipArchive;

use crate::assemble::{self, Assembly};
use crate::{MAX_ENTRY_COUNT, MAX_EXTRACTED_SIZE};

/// File type bits of a stored unix mode.
const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;

/// Unpacks a zip archive into `<dest>/<name>`, applying stored unix modes.
#[derive(Debug)]
pub struct ZipInstaller {
    fs: Arc<dyn Fs>,
}

impl ZipInstaller {
    /// Create an installer bound to `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self { fs }
    }

    /// Whether `source` is an existing `.zip` file.
    #[must_use]
    pub fn accepts(ctx: &InstallContext, source: &str) -> bool {
        assemble::has_suffix(source, ".zip") && assemble::is_file(ctx, source)
    }
}

#[async_trait]
impl Installer for ZipInstaller {
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
            let assembly = Assembly::new(&dest)?;
            extract_zip(&token, File::open(&source)?, assembly.payload())?;

            let root = assembly.root()?;
            let plugin = assemble::resolve_metadata(&source, &root)?;
            assembly.commit(&fs, &dest, &root, &plugin)?;
            Ok(plugin)
        })
        .await
    }
}

/// Extract a zip archive into `dest`.
///
/// # Errors
///
/// Returns `InstallError::ExtractionError` on malformed or oversized
/// archives, `InstallError::PathTraversal` on entries that would land
/// outside `dest` and `InstallError::UnsafeEntryType` on links and special
/// files.
pub(crate) fn extract_zip(
    token: &CancellationToken,
    data: impl Read + Seek,
    dest: &Path,
) -> InstallResult<()> {
    let mut archive = ZipArchive::new(data).map_err(|e| InstallError::ExtractionError {
        message: format!("failed to open zip archive: {e}"),
    })?;

    if archive.is_empty() {
        return Err(InstallError::ExtractionError {
            message: "archive is empty".into(),
        });
    }
    if archive.len() > MAX_ENTRY_COUNT {
        return Err(InstallError::ExtractionError {
            message: format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
        });
    }

    let mut total_size: u64 = 0;

    for i in 0..archive.len() {
        assemble::check_cancelled(token)?;

        let mut file = archive
            .by_index(i)
            .map_err(|e| InstallError::ExtractionError {
                message: format!("failed to read zip entry {i}: {e}"),
            })?;

        let entry_path = file
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| InstallError::PathTraversal {
                path: file.name().to_string(),
            })?;
        assemble::validate_entry_path(&entry_path)?;
        let target = dest.join(&entry_path);

        if file.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(kind) = file.unix_mode().map(|mode| mode & S_IFMT)
            && kind != 0
            && kind != S_IFREG
        {
            return Err(InstallError::UnsafeEntryType {
                entry_type: if kind == S_IFLNK {
                    "Symlink".to_string()
                } else {
                    format!("{kind:o}")
                },
                path: entry_path.display().to_string(),
            });
        }

        total_size = total_size.saturating_add(file.size());
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(InstallError::ExtractionError {
                message: format!(
                    "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
                ),
            });
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        // The declared size is not trusted; cap what is actually inflated.
        let limit = file.size().saturating_add(1);
        let written = io::copy(&mut (&mut file).take(limit), &mut out)?;
        if written > file.size() {
            return Err(InstallError::ExtractionError {
                message: format!("zip entry {} exceeds its declared size", entry_path.display()),
            });
        }

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o777))?;
        }
    }

    Ok(())
}

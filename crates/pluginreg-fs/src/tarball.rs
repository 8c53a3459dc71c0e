//! Installer for gzip-compressed tarballs (`.tar.gz`, `.tgz`).
//!
//! Extraction guards against:
//! - Path traversal (`../` components)
//! - Absolute paths
//! - Links, device nodes and other non-regular entries
//! - Excessive entry counts and extracted sizes

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use pluginreg_core::{Fs, InstallContext, InstallError, InstallResult, Installer, Plugin};
use tar::Archive;
use tokio_util::sync::CancellationToken;

use crate::assemble::{self, Assembly};
use crate::{MAX_ENTRY_COUNT, MAX_EXTRACTED_SIZE};

/// Unpacks a gzip-compressed tarball into `<dest>/<name>`.
#[derive(Debug)]
pub struct TarballInstaller {
    fs: Arc<dyn Fs>,
}

impl TarballInstaller {
    /// Create an installer bound to `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self { fs }
    }

    /// Whether `source` is an existing `.tar.gz` or `.tgz` file.
    #[must_use]
    pub fn accepts(ctx: &InstallContext, source: &str) -> bool {
        (assemble::has_suffix(source, ".tar.gz") || assemble::has_suffix(source, ".tgz"))
            && assemble::is_file(ctx, source)
    }
}

#[async_trait]
impl Installer for TarballInstaller {
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
            extract_tarball(&token, File::open(&source)?, assembly.payload())?;

            let root = assembly.root()?;
            let plugin = assemble::resolve_metadata(&source, &root)?;
            assembly.commit(&fs, &dest, &root, &plugin)?;
            Ok(plugin)
        })
        .await
    }
}

/// Extract a gzip-compressed tarball into `dest`.
///
/// # Errors
///
/// Returns `InstallError::ExtractionError` on decompression or archive
/// failures, `InstallError::PathTraversal` on malicious paths and
/// `InstallError::UnsafeEntryType` on links and special files.
pub(crate) fn extract_tarball(
    token: &CancellationToken,
    data: impl Read,
    dest: &Path,
) -> InstallResult<()> {
    extract_tar(token, GzDecoder::new(data), dest)
}

/// Extract an uncompressed tar stream into `dest`.
pub(crate) fn extract_tar(
    token: &CancellationToken,
    data: impl Read,
    dest: &Path,
) -> InstallResult<()> {
    let mut archive = Archive::new(data);
    // Keep rwx bits only; setuid/setgid from the archive are dropped.
    archive.set_preserve_permissions(false);

    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    for entry_result in archive
        .entries()
        .map_err(|e| InstallError::ExtractionError {
            message: format!("failed to read archive entries: {e}"),
        })?
    {
        assemble::check_cancelled(token)?;

        let mut entry = entry_result.map_err(|e| InstallError::ExtractionError {
            message: format!("failed to read archive entry: {e}"),
        })?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(InstallError::ExtractionError {
                message: format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
            });
        }

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            let entry_path = entry
                .path()
                .map_or_else(|_| "<unknown>".to_string(), |p| p.display().to_string());
            return Err(InstallError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: entry_path,
            });
        }

        let entry_size = entry
            .header()
            .size()
            .map_err(|e| InstallError::ExtractionError {
                message: format!("failed to read entry size: {e}"),
            })?;
        total_size = total_size.saturating_add(entry_size);
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(InstallError::ExtractionError {
                message: format!(
                    "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
                ),
            });
        }

        let entry_path = entry
            .path()
            .map_err(|e| InstallError::ExtractionError {
                message: format!("failed to read entry path: {e}"),
            })?
            .into_owned();
        assemble::validate_entry_path(&entry_path)?;

        let target = dest.join(&entry_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::ExtractionError {
                message: format!("failed to create directory {}: {e}", parent.display()),
            })?;
        }

        entry
            .unpack(&target)
            .map_err(|e| InstallError::ExtractionError {
                message: format!("failed to unpack {}: {e}", entry_path.display()),
            })?;
    }

    if entry_count == 0 {
        return Err(InstallError::ExtractionError {
            message: "archive is empty".into(),
        });
    }

    Ok(())
}

/// Regular files, directories and metadata headers only.
fn is_safe_entry_type(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::Regular
            | tar::EntryType::Directory
            | tar::EntryType::GNULongName
            | tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
    )
}

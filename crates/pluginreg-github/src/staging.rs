//! Download-to-temp-directory staging.
//!
//! The asset is written into a fresh staging directory together with the
//! plugin metadata. The directory is owned by a [`StagingDir`] guard and
//! removed when the guard drops, on success, error and unwind alike.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use pluginreg_core::{Fs, InstallContext, Plugin, write_metadata_file};
use tracing::{debug, warn};

use crate::error::{ErrorContext, GithubError, Stage};
use crate::service::{Asset, AssetStream};

/// Mode applied to staged executables and tarballs.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Mode staged files are created with.
const ARTIFACT_FILE_MODE: u32 = 0o644;

/// Content types whose staged file gets the requested mode.
const CHMOD_CONTENT_TYPES: &[&str] = &["application/octet-stream", "application/gzip"];

/// An exclusively owned staging directory, removed on drop.
#[derive(Debug)]
pub struct StagingDir {
    fs: Arc<dyn Fs>,
    path: PathBuf,
}

impl StagingDir {
    /// Create a fresh directory whose name starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the filesystem error; nothing needs cleaning up then.
    pub fn create(fs: Arc<dyn Fs>, prefix: &str) -> io::Result<Self> {
        let path = fs.create_temp_dir(prefix)?;
        debug!(path = %path.display(), "created staging directory");
        Ok(Self { fs, path })
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
        }
    }
}

/// Apply `mode` to `path` when the content type asks for it.
///
/// Only raw binaries (`application/octet-stream`) and gzip streams
/// (`application/gzip`) are changed. Everything else, and an absent content
/// type, keeps its creation mode; archive installers set modes on
/// extraction.
///
/// # Errors
///
/// Returns the filesystem error from the permission change.
pub fn chmod_artifact(
    fs: &dyn Fs,
    content_type: Option<&str>,
    path: &Path,
    mode: u32,
) -> io::Result<()> {
    match content_type {
        Some(ct) if CHMOD_CONTENT_TYPES.contains(&ct) => fs.chmod(path, mode),
        _ => Ok(()),
    }
}

/// The path handed to the delegate installer.
///
/// A file name with an extension is installed from the file itself. An
/// extension-less one (a raw executable) is installed from the staging
/// directory, where the installer finds it next to the metadata file.
#[must_use]
pub fn dispatch_path(staging: &Path, asset_file: &Path) -> PathBuf {
    if asset_file.extension().is_some() {
        asset_file.to_path_buf()
    } else {
        staging.to_path_buf()
    }
}

/// Stage a downloading asset and its metadata.
///
/// Returns the staging directory guard and the dispatch path inside it.
///
/// # Errors
///
/// Each step fails with its own stage prefix. The staging directory is
/// removed before the error is returned.
pub async fn stage(
    fs: &Arc<dyn Fs>,
    ctx: &InstallContext,
    temp_prefix: &str,
    asset: &Asset,
    download: AssetStream,
    plugin: &Plugin,
    context: &ErrorContext,
) -> Result<(StagingDir, PathBuf), GithubError> {
    let staging = StagingDir::create(Arc::clone(fs), temp_prefix)
        .map_err(|e| GithubError::stage(Stage::CreateTempDir, context, e))?;

    let file_name = asset_file_name(&asset.name)
        .map_err(|e| GithubError::stage(Stage::WriteArtifact, context, e))?;
    let asset_file = staging.path().join(file_name);

    write_artifact(fs.as_ref(), ctx, &asset_file, download)
        .await
        .map_err(|e| match e {
            WriteError::Cancelled => GithubError::Cancelled,
            WriteError::Io(e) => GithubError::stage(Stage::WriteArtifact, context, e),
        })?;

    chmod_artifact(
        fs.as_ref(),
        asset.content_type.as_deref(),
        &asset_file,
        EXECUTABLE_MODE,
    )
    .map_err(|e| GithubError::stage(Stage::ChmodArtifact, context, e))?;

    write_metadata_file(fs.as_ref(), staging.path(), plugin)
        .map_err(|e| GithubError::stage(Stage::WriteMetadata, context, e))?;

    let dispatch = dispatch_path(staging.path(), &asset_file);
    debug!(
        asset = %asset.name,
        dispatch = %dispatch.display(),
        "staged release asset"
    );

    Ok((staging, dispatch))
}

enum WriteError {
    Cancelled,
    Io(io::Error),
}

impl From<io::Error> for WriteError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

async fn write_artifact(
    fs: &dyn Fs,
    ctx: &InstallContext,
    path: &Path,
    mut download: AssetStream,
) -> Result<(), WriteError> {
    let mut file = fs.open_file(path, ARTIFACT_FILE_MODE)?;

    loop {
        let Some(next) = ctx.run_until_cancelled(download.next()).await else {
            return Err(WriteError::Cancelled);
        };
        let Some(chunk) = next.transpose()? else {
            break;
        };
        file.write_all(&chunk)?;
    }

    file.flush()?;
    Ok(())
}

/// The asset name as a single file name inside the staging directory.
fn asset_file_name(name: &str) -> io::Result<&Path> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid asset name '{name}'"),
        )),
    }
}

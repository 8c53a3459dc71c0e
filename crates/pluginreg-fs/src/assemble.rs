//! Shared installation assembly for the filesystem installers.
//!
//! Every installer unpacks its source into a scratch directory created
//! inside the destination, resolves the plugin metadata, and then moves the
//! assembled tree to `<dest>/<name>` in a single rename. A failed install
//! leaves the destination as it was; the scratch directory is removed when
//! the [`Assembly`] is dropped.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pluginreg_core::{
    Fs, InstallContext, InstallError, InstallResult, METADATA_FILE, Plugin, read_metadata_file,
    write_metadata_file,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = ".pluginreg-";
const PAYLOAD_DIR: &str = "payload";
const PREVIOUS_DIR: &str = "previous";

/// Scratch area in which one installation is assembled.
pub(crate) struct Assembly {
    scratch: TempDir,
    payload: PathBuf,
}

impl Assembly {
    /// Create the destination if needed and a scratch directory inside it.
    pub(crate) fn new(dest: &Path) -> InstallResult<Self> {
        std::fs::create_dir_all(dest)?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(dest)?;
        let payload = scratch.path().join(PAYLOAD_DIR);
        std::fs::create_dir(&payload)?;

        Ok(Self { scratch, payload })
    }

    /// Scratch path outside the payload for intermediate files.
    pub(crate) fn scratch_path(&self, name: &str) -> PathBuf {
        self.scratch.path().join(name)
    }

    /// Directory the source is unpacked into.
    pub(crate) fn payload(&self) -> &Path {
        &self.payload
    }

    /// Root of the unpacked plugin.
    ///
    /// Archives commonly wrap their contents in a single top-level
    /// directory. When the payload holds exactly one directory and no
    /// metadata file of its own, that directory is the root.
    pub(crate) fn root(&self) -> InstallResult<PathBuf> {
        if self.payload.join(METADATA_FILE).is_file() {
            return Ok(self.payload.clone());
        }

        let entries = std::fs::read_dir(&self.payload)?.collect::<Result<Vec<_>, _>>()?;
        if let [only] = entries.as_slice()
            && only.file_type()?.is_dir()
        {
            return Ok(only.path());
        }

        Ok(self.payload.clone())
    }

    /// Write the final metadata into `root` and move it to `<dest>/<name>`,
    /// replacing any earlier installation of the same plugin.
    pub(crate) fn commit(
        self,
        fs: &Arc<dyn Fs>,
        dest: &Path,
        root: &Path,
        plugin: &Plugin,
    ) -> InstallResult<PathBuf> {
        validate_plugin_name(&plugin.name)?;

        fs.remove_all(&root.join(METADATA_FILE))?;
        write_metadata_file(fs.as_ref(), root, plugin)?;

        let target = dest.join(&plugin.name);
        let previous = self.scratch.path().join(PREVIOUS_DIR);
        let replacing = target.exists();
        if replacing {
            std::fs::rename(&target, &previous)?;
        }

        if let Err(e) = std::fs::rename(root, &target) {
            if replacing {
                restore_previous(self.scratch, &previous, &target);
            }
            return Err(e.into());
        }

        debug!(plugin = %plugin.name, target = %target.display(), replacing, "installed plugin");
        Ok(target)
    }
}

/// Move the displaced installation back to `target`.
///
/// If that fails the scratch directory is kept on disk so the previous
/// installation is not deleted with it. Returns the kept scratch path.
fn restore_previous(scratch: TempDir, previous: &Path, target: &Path) -> Option<PathBuf> {
    match std::fs::rename(previous, target) {
        Ok(()) => None,
        Err(e) => {
            let kept = scratch.keep();
            warn!(
                target = %target.display(),
                previous = %kept.join(PREVIOUS_DIR).display(),
                error = %e,
                "could not restore previous installation"
            );
            Some(kept)
        },
    }
}

/// Plugin metadata for `source`.
///
/// A metadata file next to the source wins over one inside the unpacked
/// root. This is how staged release assets carry the descriptor resolved
/// from the release.
pub(crate) fn resolve_metadata(source: &Path, root: &Path) -> InstallResult<Plugin> {
    match sibling_metadata(source)? {
        Some(plugin) => Ok(plugin),
        None => root_metadata(source, root),
    }
}

/// Metadata file at the root of the unpacked tree.
pub(crate) fn root_metadata(source: &Path, root: &Path) -> InstallResult<Plugin> {
    let inner = root.join(METADATA_FILE);
    if inner.is_file() {
        return Ok(read_metadata_file(&inner)?);
    }

    Err(InstallError::MissingMetadata {
        path: source.to_path_buf(),
    })
}

/// Metadata file in the source's parent directory, if any.
pub(crate) fn sibling_metadata(source: &Path) -> InstallResult<Option<Plugin>> {
    let Some(parent) = source.parent() else {
        return Ok(None);
    };

    let path = parent.join(METADATA_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    Ok(Some(read_metadata_file(&path)?))
}

/// A plugin name must be a single normal path component.
pub(crate) fn validate_plugin_name(name: &str) -> InstallResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(InstallError::InvalidPluginName {
            name: name.to_string(),
        }),
    }
}

/// Validate that an archive entry path has no traversal components or
/// absolute paths.
pub(crate) fn validate_entry_path(path: &Path) -> InstallResult<()> {
    if path.is_absolute() {
        return Err(InstallError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return Err(InstallError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }

    Ok(())
}

/// Fail with [`InstallError::Cancelled`] once `token` is cancelled.
pub(crate) fn check_cancelled(token: &CancellationToken) -> InstallResult<()> {
    if token.is_cancelled() {
        return Err(InstallError::Cancelled);
    }
    Ok(())
}

/// Run a blocking install step on the blocking pool.
pub(crate) async fn run_blocking<F>(ctx: &InstallContext, f: F) -> InstallResult<Plugin>
where
    F: FnOnce(CancellationToken) -> InstallResult<Plugin> + Send + 'static,
{
    ctx.ensure_active()?;
    let token = ctx.cancellation().clone();

    tokio::task::spawn_blocking(move || f(token))
        .await
        .map_err(|e| InstallError::ExtractionError {
            message: format!("install task failed: {e}"),
        })?
}

/// Case-insensitive suffix test on a source path.
pub(crate) fn has_suffix(source: &str, suffix: &str) -> bool {
    source.to_ascii_lowercase().ends_with(suffix)
}

/// Whether `source` names an existing regular file.
pub(crate) fn is_file(ctx: &InstallContext, source: &str) -> bool {
    ctx.fs()
        .stat(Path::new(source))
        .is_ok_and(|stat| !stat.is_dir)
}

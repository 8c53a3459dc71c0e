//! Installer for gzip-compressed files (`.gz` that is not `.tar.gz`).
//!
//! The decompressed stream is sniffed: a tar archive is extracted like a
//! tarball, anything else is treated as a single executable and installed
//! as `<dest>/<name>/<name>`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use pluginreg_core::{Fs, InstallContext, InstallError, InstallResult, Installer, Plugin};
use tokio_util::sync::CancellationToken;

use crate::assemble::{self, Assembly};
use crate::tarball::extract_tar;
use crate::{EXECUTABLE_MODE, MAX_EXTRACTED_SIZE};

const DECOMPRESSED_FILE: &str = "decompressed";

/// Offset and value of the ustar magic in a tar header.
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Decompresses a `.gz` file into `<dest>/<name>`.
#[derive(Debug)]
pub struct GzipInstaller {
    fs: Arc<dyn Fs>,
}

impl GzipInstaller {
    /// Create an installer bound to `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self { fs }
    }

    /// Whether `source` is an existing `.gz` file that is not a `.tar.gz`.
    #[must_use]
    pub fn accepts(ctx: &InstallContext, source: &str) -> bool {
        assemble::has_suffix(source, ".gz")
            && !assemble::has_suffix(source, ".tar.gz")
            && assemble::is_file(ctx, source)
    }
}

#[async_trait]
impl Installer for GzipInstaller {
    async fn install(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        source: &str,
    ) -> InstallResult<Plugin> {
        let fs = Arc::clone(&self.fs);
        let dest = dest.to_path_buf();
        let source = Path::new(source).to_path_buf();

        assemble::run_blocking(ctx, move |token| install_gzip(&fs, &token, &dest, &source)).await
    }
}

fn install_gzip(
    fs: &Arc<dyn Fs>,
    token: &CancellationToken,
    dest: &Path,
    source: &Path,
) -> InstallResult<Plugin> {
    let assembly = Assembly::new(dest)?;

    let decompressed_path = assembly.scratch_path(DECOMPRESSED_FILE);
    decompress(File::open(source)?, &decompressed_path)?;
    assemble::check_cancelled(token)?;

    let mut decompressed = File::open(&decompressed_path)?;
    if is_tar(&mut decompressed)? {
        extract_tar(token, decompressed, assembly.payload())?;

        let root = assembly.root()?;
        let plugin = assemble::resolve_metadata(source, &root)?;
        assembly.commit(fs, dest, &root, &plugin)?;
        return Ok(plugin);
    }
    drop(decompressed);

    // A bare file carries no metadata of its own.
    let plugin = assemble::sibling_metadata(source)?.ok_or_else(|| {
        InstallError::MissingMetadata {
            path: source.to_path_buf(),
        }
    })?;
    assemble::validate_plugin_name(&plugin.name)?;

    let binary = assembly.payload().join(&plugin.name);
    std::fs::rename(&decompressed_path, &binary)?;
    fs.chmod(&binary, EXECUTABLE_MODE)?;

    let root = assembly.payload().to_path_buf();
    assembly.commit(fs, dest, &root, &plugin)?;
    Ok(plugin)
}

fn decompress(data: impl Read, target: &Path) -> InstallResult<()> {
    let mut decoder = GzDecoder::new(data).take(MAX_EXTRACTED_SIZE.saturating_add(1));
    let mut out = File::create(target)?;

    let written = io::copy(&mut decoder, &mut out).map_err(|e| InstallError::ExtractionError {
        message: format!("failed to decompress: {e}"),
    })?;
    if written > MAX_EXTRACTED_SIZE {
        return Err(InstallError::ExtractionError {
            message: format!(
                "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
            ),
        });
    }

    Ok(())
}

fn is_tar(file: &mut File) -> io::Result<bool> {
    let mut header = [0u8; 512];
    let mut filled = 0usize;
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled = filled.saturating_add(n);
    }
    file.seek(SeekFrom::Start(0))?;

    let magic_end = TAR_MAGIC_OFFSET.saturating_add(TAR_MAGIC.len());
    Ok(filled >= magic_end && &header[TAR_MAGIC_OFFSET..magic_end] == TAR_MAGIC)
}

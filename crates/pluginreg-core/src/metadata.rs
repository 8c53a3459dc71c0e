//! YAML codec for the plugin metadata document.

use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::fs::Fs;
use crate::plugin::{METADATA_FILE, Plugin};

/// Permission bits for metadata files written by installers.
const METADATA_FILE_MODE: u32 = 0o644;

/// Errors from decoding or encoding plugin metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The document is empty.
    #[error("EOF")]
    Empty,

    /// The document is not valid metadata YAML.
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document could not be read.
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Decode a metadata document.
///
/// A stream with no document (empty, whitespace or comments only) is an
/// error rather than a defaulted descriptor.
///
/// # Errors
///
/// Returns [`MetadataError::Empty`] for an empty document and
/// [`MetadataError::Yaml`] when the document does not decode.
pub fn decode_metadata(data: &[u8]) -> MetadataResult<Plugin> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(MetadataError::Empty);
    }

    let value: serde_yaml::Value = serde_yaml::from_slice(data)?;
    if value.is_null() {
        return Err(MetadataError::Empty);
    }

    Ok(serde_yaml::from_value(value)?)
}

/// Read and decode the metadata file at `path`.
///
/// # Errors
///
/// Returns [`MetadataError::Io`] if the file cannot be read, otherwise the
/// errors of [`decode_metadata`].
pub fn read_metadata_file(path: &Path) -> MetadataResult<Plugin> {
    let data = std::fs::read(path)?;
    decode_metadata(&data)
}

/// Write `plugin` to `<dir>/.plugin.registry.yaml` through `fs`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, or if encoding or
/// copying fails.
pub fn write_metadata_file(fs: &dyn Fs, dir: &Path, plugin: &Plugin) -> io::Result<()> {
    let mut file = fs.open_file(&dir.join(METADATA_FILE), METADATA_FILE_MODE)?;
    io::copy(&mut MetadataReader::new(plugin), &mut file)?;
    file.flush()
}

/// Lazy, single-shot YAML encoder exposed as a [`Read`].
///
/// The value is serialized on the first `read` call and the encoded bytes
/// are served until drained. The value is consumed by that first call: once
/// the buffer is empty (or encoding failed) every further read returns
/// `Ok(0)`.
pub struct MetadataReader<'a, T: ?Sized> {
    value: Option<&'a T>,
    buffer: Cursor<Vec<u8>>,
}

impl<'a, T: Serialize + ?Sized> MetadataReader<'a, T> {
    /// Create a reader that will encode `value` on first read.
    #[must_use]
    pub fn new(value: &'a T) -> Self {
        Self {
            value: Some(value),
            buffer: Cursor::new(Vec::new()),
        }
    }
}

impl<T: Serialize + ?Sized> Read for MetadataReader<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(value) = self.value.take() {
            let encoded = serde_yaml::to_string(value).map_err(io::Error::other)?;
            self.buffer = Cursor::new(encoded.into_bytes());
        }

        self.buffer.read(buf)
    }
}

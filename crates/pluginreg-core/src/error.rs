//! Installer error types.

use std::path::PathBuf;

use crate::metadata::MetadataError;

/// Errors returned by [`Installer::install`](crate::Installer::install) and
/// registry discovery.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// No registered predicate accepted the source.
    #[error("no supported installer")]
    NoSupportedInstaller {
        /// The source that nothing matched.
        path: String,
    },

    /// The caller cancelled the install.
    #[error("install cancelled")]
    Cancelled,

    /// The source has no plugin metadata file.
    #[error("missing plugin metadata in {path}")]
    MissingMetadata {
        /// Directory or archive that was searched.
        path: PathBuf,
    },

    /// The plugin name cannot be used as an installation directory.
    #[error("invalid plugin name: '{name}'")]
    InvalidPluginName {
        /// The rejected name.
        name: String,
    },

    /// Plugin metadata could not be read or decoded.
    #[error("could not load plugin metadata: {0}")]
    Metadata(#[from] MetadataError),

    /// Archive extraction failure.
    #[error("extraction error: {message}")]
    ExtractionError {
        /// Description of the extraction failure.
        message: String,
    },

    /// Unsafe entry type in archive (e.g. symlink, hardlink, device node).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The entry type that was rejected.
        entry_type: String,
        /// The path of the entry.
        path: String,
    },

    /// Path traversal detected in archive entry.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure raised by a source-specific installer, displayed verbatim.
    #[error(transparent)]
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl InstallError {
    /// Wrap a source-specific error without altering its message.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(err))
    }
}

/// Result type for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;

//! Error types for the GitHub plugin source.

use std::fmt;

use pluginreg_core::InstallError;

/// Errors from [`parse`](crate::source::parse).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The URL is not anchored at the configured hostname.
    #[error("not a github url")]
    NotGithub,
    /// The owner segment is empty.
    #[error("missing github owner")]
    MissingOwner,
    /// The repository segment is empty.
    #[error("missing github repository")]
    MissingRepository,
}

/// Errors from a [`RepositoryService`](crate::RepositoryService).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport failure.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{method} {url}: {status} {message}")]
    Status {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Any other failure, displayed verbatim.
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Create an error displayed as `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Result type for repository service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Pipeline step a [`GithubError`] came from. Displays as the stable
/// message prefix of that step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Parsing the plugin URL.
    ParseUrl,
    /// Fetching the latest release.
    LatestRelease,
    /// Fetching a release by tag.
    ReleaseByTag,
    /// Downloading the metadata document at the release tag.
    GetMetadata,
    /// Decoding the metadata document.
    LoadMetadata,
    /// Matching the platform artifact against the release assets.
    FindArtifact,
    /// Starting the asset download.
    DownloadArtifact,
    /// Creating the staging directory.
    CreateTempDir,
    /// Writing the asset into the staging directory.
    WriteArtifact,
    /// Applying the permission policy.
    ChmodArtifact,
    /// Writing the metadata next to the asset.
    WriteMetadata,
}

impl Stage {
    /// Stable message prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseUrl => "could not parse url",
            Self::LatestRelease => "could not find latest release",
            Self::ReleaseByTag => "could not get release",
            Self::GetMetadata => "could not get plugin metadata",
            Self::LoadMetadata => "could not load plugin metadata",
            Self::FindArtifact => "could not find artifact",
            Self::DownloadArtifact => "could not download artifact",
            Self::CreateTempDir => "could not create temp dir",
            Self::WriteArtifact => "could not write artifact",
            Self::ChmodArtifact => "could not chmod artifact",
            Self::WriteMetadata => "could not write plugin metadata",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic context attached to a [`GithubError`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The plugin URL as given.
    pub source: String,
    /// Repository owner, once parsed.
    pub owner: String,
    /// Repository name, once parsed.
    pub repository: String,
    /// Release tag, once resolved.
    pub tag: Option<String>,
    /// Matched asset `(id, name)`, once selected.
    pub asset: Option<(u64, String)>,
}

impl ErrorContext {
    /// Context for a plugin URL that has not been parsed yet.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }
}

/// The selected artifact is not among the release assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("artifact not found")]
pub struct ArtifactNotFound;

/// Errors from the GitHub installer pipeline.
///
/// Step failures display as `"<stage prefix>: <cause>"`. Dispatch failures
/// display exactly as the delegate reported them.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    /// A pipeline step failed.
    #[error("{stage}: {source}")]
    Stage {
        /// Step that failed.
        stage: Stage,
        /// Diagnostic context.
        context: Box<ErrorContext>,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The latest release carries no tag to pin the install to.
    #[error("latest release has no tag name")]
    MissingTagName {
        /// Diagnostic context.
        context: Box<ErrorContext>,
    },

    /// The caller cancelled the install.
    #[error("install cancelled")]
    Cancelled,

    /// Discovery or the delegate installer failed; displayed verbatim.
    #[error(transparent)]
    Dispatch(InstallError),
}

impl GithubError {
    /// Wrap `source` with the prefix of `stage`.
    pub fn stage(
        stage: Stage,
        context: &ErrorContext,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Stage {
            stage,
            context: Box::new(context.clone()),
            source: source.into(),
        }
    }

    /// Wrap a remote failure, surfacing cancellation as [`GithubError::Cancelled`].
    #[must_use]
    pub fn remote(stage: Stage, context: &ErrorContext, source: ServiceError) -> Self {
        match source {
            ServiceError::Cancelled => Self::Cancelled,
            other => Self::stage(stage, context, other),
        }
    }

    /// Step that failed, if this error came from one.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::MissingTagName { .. } => Some(Stage::LatestRelease),
            Self::Cancelled | Self::Dispatch(_) => None,
        }
    }

    /// Diagnostic context, if attached.
    #[must_use]
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Stage { context, .. } | Self::MissingTagName { context } => Some(&**context),
            Self::Cancelled | Self::Dispatch(_) => None,
        }
    }
}

impl From<GithubError> for InstallError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Dispatch(inner) => inner,
            GithubError::Cancelled => InstallError::Cancelled,
            other => InstallError::other(other),
        }
    }
}

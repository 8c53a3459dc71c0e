//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pluginreg_core::InstallContext;
use pluginreg_github::{AssetStream, Release, RepositoryService, ServiceError, ServiceResult};

/// One call made to a [`MockRepositoryService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// `latest_release(owner, repository)`
    LatestRelease {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repository: String,
    },
    /// `release_by_tag(owner, repository, tag)`
    ReleaseByTag {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repository: String,
        /// Requested tag.
        tag: String,
    },
    /// `download_contents(owner, repository, path, git_ref)`
    DownloadContents {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repository: String,
        /// File path.
        path: String,
        /// Git ref.
        git_ref: String,
    },
    /// `download_release_asset(owner, repository, asset_id)`
    DownloadReleaseAsset {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repository: String,
        /// Asset id.
        asset_id: u64,
    },
}

type Scripted<T> = Result<T, String>;

#[derive(Debug, Default)]
struct Script {
    latest: HashMap<String, Scripted<Release>>,
    tagged: HashMap<String, Scripted<Release>>,
    contents: HashMap<String, Scripted<Vec<u8>>>,
    assets: HashMap<String, Scripted<Vec<u8>>>,
}

/// Scripted [`RepositoryService`].
///
/// Responses are keyed by repository (and tag, ref or asset id). Anything
/// not scripted fails like the GitHub API does, with a `404 Not Found`
/// status error. Every call is recorded in order.
///
/// Uses `std::sync::Mutex` internally so builder methods work without a
/// tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct MockRepositoryService {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<ServiceCall>>>,
    chunk_size: Option<usize>,
}

fn repo_key(owner: &str, repository: &str) -> String {
    format!("{owner}/{repository}")
}

impl MockRepositoryService {
    /// Create a service with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, f: impl FnOnce(&mut Script)) {
        if let Ok(mut guard) = self.script.lock() {
            f(&mut guard);
        }
    }

    /// Script the latest release of `owner/repository`.
    #[must_use]
    pub fn with_latest(self, owner: &str, repository: &str, release: Release) -> Self {
        self.script(|s| {
            s.latest.insert(repo_key(owner, repository), Ok(release));
        });
        self
    }

    /// Script the release tagged `tag`.
    #[must_use]
    pub fn with_release(self, owner: &str, repository: &str, tag: &str, release: Release) -> Self {
        self.script(|s| {
            s.tagged
                .insert(format!("{}@{tag}", repo_key(owner, repository)), Ok(release));
        });
        self
    }

    /// Script a release as both the latest and the one tagged with its tag.
    #[must_use]
    pub fn with_published(self, owner: &str, repository: &str, release: Release) -> Self {
        let tag = release.tag_name.clone().unwrap_or_default();
        self.with_latest(owner, repository, release.clone())
            .with_release(owner, repository, &tag, release)
    }

    /// Script the metadata document at `git_ref`.
    #[must_use]
    pub fn with_contents(
        self,
        owner: &str,
        repository: &str,
        git_ref: &str,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        let data = data.into();
        self.script(|s| {
            s.contents
                .insert(format!("{}@{git_ref}", repo_key(owner, repository)), Ok(data));
        });
        self
    }

    /// Script the bytes of asset `asset_id`.
    #[must_use]
    pub fn with_asset(
        self,
        owner: &str,
        repository: &str,
        asset_id: u64,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        let data = data.into();
        self.script(|s| {
            s.assets
                .insert(format!("{}#{asset_id}", repo_key(owner, repository)), Ok(data));
        });
        self
    }

    /// Make `latest_release` fail with `message`.
    #[must_use]
    pub fn failing_latest(self, owner: &str, repository: &str, message: &str) -> Self {
        self.script(|s| {
            s.latest
                .insert(repo_key(owner, repository), Err(message.to_string()));
        });
        self
    }

    /// Make `release_by_tag` fail with `message`.
    #[must_use]
    pub fn failing_release(self, owner: &str, repository: &str, tag: &str, message: &str) -> Self {
        self.script(|s| {
            s.tagged.insert(
                format!("{}@{tag}", repo_key(owner, repository)),
                Err(message.to_string()),
            );
        });
        self
    }

    /// Make `download_contents` at `git_ref` fail with `message`.
    #[must_use]
    pub fn failing_contents(
        self,
        owner: &str,
        repository: &str,
        git_ref: &str,
        message: &str,
    ) -> Self {
        self.script(|s| {
            s.contents.insert(
                format!("{}@{git_ref}", repo_key(owner, repository)),
                Err(message.to_string()),
            );
        });
        self
    }

    /// Make `download_release_asset` fail with `message`.
    #[must_use]
    pub fn failing_asset(
        self,
        owner: &str,
        repository: &str,
        asset_id: u64,
        message: &str,
    ) -> Self {
        self.script(|s| {
            s.assets.insert(
                format!("{}#{asset_id}", repo_key(owner, repository)),
                Err(message.to_string()),
            );
        });
        self
    }

    /// Deliver asset bytes in chunks of `size` instead of one piece.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of asset downloads started.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ServiceCall::DownloadReleaseAsset { .. }))
            .count()
    }

    fn record(&self, call: ServiceCall) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }

    fn lookup<T: Clone>(
        &self,
        pick: impl FnOnce(&Script) -> Option<&Scripted<T>>,
        what: &str,
    ) -> ServiceResult<T> {
        let entry = self
            .script
            .lock()
            .ok()
            .and_then(|s| pick(&*s).cloned());
        match entry {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(ServiceError::other(message)),
            None => Err(not_found(what)),
        }
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::Status {
        method: "GET".to_string(),
        url: format!("mock://{what}"),
        status: 404,
        message: "Not Found".to_string(),
    }
}

#[async_trait]
impl RepositoryService for MockRepositoryService {
    async fn latest_release(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
    ) -> ServiceResult<Release> {
        self.record(ServiceCall::LatestRelease {
            owner: owner.to_string(),
            repository: repository.to_string(),
        });
        if ctx.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        let key = repo_key(owner, repository);
        self.lookup(|s| s.latest.get(&key), &format!("{key}/releases/latest"))
    }

    async fn release_by_tag(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Release> {
        self.record(ServiceCall::ReleaseByTag {
            owner: owner.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        });
        if ctx.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        let key = format!("{}@{tag}", repo_key(owner, repository));
        self.lookup(|s| s.tagged.get(&key), &key)
    }

    async fn download_contents(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> ServiceResult<Vec<u8>> {
        self.record(ServiceCall::DownloadContents {
            owner: owner.to_string(),
            repository: repository.to_string(),
            path: path.to_string(),
            git_ref: git_ref.to_string(),
        });
        if ctx.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        let key = format!("{}@{git_ref}", repo_key(owner, repository));
        self.lookup(|s| s.contents.get(&key), &format!("{key}/{path}"))
    }

    async fn download_release_asset(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        asset_id: u64,
    ) -> ServiceResult<AssetStream> {
        self.record(ServiceCall::DownloadReleaseAsset {
            owner: owner.to_string(),
            repository: repository.to_string(),
            asset_id,
        });
        if ctx.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        let key = format!("{}#{asset_id}", repo_key(owner, repository));
        let data = self.lookup(|s| s.assets.get(&key), &key)?;

        let chunk_size = self.chunk_size.unwrap_or(data.len().max(1));
        let chunks: Vec<std::io::Result<Vec<u8>>> =
            data.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

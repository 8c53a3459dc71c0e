//! Test doubles shared by this crate's unit tests.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use pluginreg_core::{FileStat, Fs, InstallContext, OsFs};

use crate::error::{ServiceError, ServiceResult};
use crate::service::{AssetStream, Release, RepositoryService};

pub(crate) fn asset_stream(data: &[u8]) -> AssetStream {
    let chunks: Vec<io::Result<Vec<u8>>> = data.chunks(4).map(|c| Ok(c.to_vec())).collect();
    Box::pin(futures::stream::iter(chunks))
}

pub(crate) fn failing_stream(message: &str) -> AssetStream {
    let chunks: Vec<io::Result<Vec<u8>>> = vec![
        Ok(b"part".to_vec()),
        Err(io::Error::other(message.to_string())),
    ];
    Box::pin(futures::stream::iter(chunks))
}

/// Scripted service. `None` entries panic when called.
#[derive(Debug, Default)]
pub(crate) struct ScriptedService {
    pub(crate) latest: Option<Result<Release, String>>,
    pub(crate) tagged: Option<Result<Release, String>>,
    pub(crate) contents: Option<Result<Vec<u8>, String>>,
    pub(crate) asset: Option<Result<Vec<u8>, String>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn scripted<T: Clone>(entry: Option<&Result<T, String>>, call: &str) -> ServiceResult<T> {
    match entry {
        Some(Ok(v)) => Ok(v.clone()),
        Some(Err(e)) => Err(ServiceError::other(e.clone())),
        None => panic!("unexpected call: {call}"),
    }
}

#[async_trait]
impl RepositoryService for ScriptedService {
    async fn latest_release(
        &self,
        _ctx: &InstallContext,
        owner: &str,
        repository: &str,
    ) -> ServiceResult<Release> {
        let call = format!("latest {owner}/{repository}");
        self.record(call.clone());
        scripted(self.latest.as_ref(), &call)
    }

    async fn release_by_tag(
        &self,
        _ctx: &InstallContext,
        owner: &str,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Release> {
        let call = format!("tag {owner}/{repository}@{tag}");
        self.record(call.clone());
        scripted(self.tagged.as_ref(), &call)
    }

    async fn download_contents(
        &self,
        _ctx: &InstallContext,
        owner: &str,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> ServiceResult<Vec<u8>> {
        let call = format!("contents {owner}/{repository}/{path}@{git_ref}");
        self.record(call.clone());
        scripted(self.contents.as_ref(), &call)
    }

    async fn download_release_asset(
        &self,
        _ctx: &InstallContext,
        owner: &str,
        repository: &str,
        asset_id: u64,
    ) -> ServiceResult<AssetStream> {
        let call = format!("asset {owner}/{repository}#{asset_id}");
        self.record(call.clone());
        scripted(self.asset.as_ref(), &call).map(|data| asset_stream(&data))
    }
}

/// Host filesystem that records removals and can fail temp dir creation.
#[derive(Debug, Default)]
pub(crate) struct RecordingFs {
    inner: OsFs,
    temp_dir_error: Option<String>,
    created: Mutex<Vec<PathBuf>>,
    removed: Mutex<Vec<PathBuf>>,
}

impl RecordingFs {
    pub(crate) fn with_temp_root(root: &Path) -> Self {
        Self {
            inner: OsFs::with_temp_root(root),
            ..Self::default()
        }
    }

    pub(crate) fn failing_temp_dir(message: &str) -> Self {
        Self {
            temp_dir_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> Vec<PathBuf> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

impl Fs for RecordingFs {
    fn create_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        if let Some(message) = &self.temp_dir_error {
            return Err(io::Error::other(message.clone()));
        }
        let path = self.inner.create_temp_dir(prefix)?;
        self.created.lock().unwrap().push(path.clone());
        Ok(path)
    }

    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        self.inner.open_file(path, mode)
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.inner.chmod(path, mode)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.removed.lock().unwrap().push(path.to_path_buf());
        self.inner.remove_all(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stat(path)
    }
}

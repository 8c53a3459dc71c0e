//! Shared harness for the GitHub install tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use pluginreg_core::{InstallContext, InstallResult, InstallerRegistry, Plugin};
use pluginreg_github::{Asset, GithubOptions, Release, RepositoryService, register_with_service};
use pluginreg_test::{FaultyFs, MockRepositoryService, fixtures};
use tempfile::TempDir;

/// Repository owner used by every scenario.
pub const OWNER: &str = "owner";
/// Repository, and plugin, name.
pub const REPO: &str = "my-plugin";
/// Published release tag.
pub const TAG: &str = "v1.4.2";
/// Asset id of the published artifact.
pub const ASSET_ID: u64 = 42;

/// Format installers, as the GitHub installer's delegates.
pub fn delegates() -> Arc<InstallerRegistry> {
    let mut delegates = InstallerRegistry::new();
    pluginreg_fs::register(&mut delegates);
    Arc::new(delegates)
}

/// Top-level registry: GitHub first, then the format installers.
pub fn registry(service: Arc<dyn RepositoryService>, options: GithubOptions) -> InstallerRegistry {
    let mut registry = InstallerRegistry::new();
    register_with_service(&mut registry, options, delegates(), service);
    pluginreg_fs::register(&mut registry);
    registry
}

/// A repository publishing `TAG` with one asset for the running platform.
pub fn published(
    asset_name: &str,
    content_type: Option<&str>,
    data: Vec<u8>,
) -> MockRepositoryService {
    MockRepositoryService::new()
        .with_published(
            OWNER,
            REPO,
            Release::tagged(TAG).with_asset(Asset::new(ASSET_ID, asset_name, content_type)),
        )
        .with_contents(OWNER, REPO, TAG, fixtures::metadata(REPO, asset_name))
        .with_asset(OWNER, REPO, ASSET_ID, data)
}

/// Destination and temp roots plus a recording filesystem over them.
///
/// Both directories are removed when the harness is dropped.
pub struct InstallHarness {
    /// Where plugins get installed.
    pub dest: TempDir,
    /// Root under which staging directories are created.
    pub temp: TempDir,
    /// Filesystem handed to the installers.
    pub fs: FaultyFs,
}

impl InstallHarness {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp root");
        let fs = FaultyFs::new(temp.path());
        Self::with_fs(temp, fs)
    }

    /// Use a pre-configured filesystem whose temp root is `temp`.
    pub fn with_fs(temp: TempDir, fs: FaultyFs) -> Self {
        Self {
            dest: TempDir::new().expect("failed to create dest"),
            temp,
            fs,
        }
    }

    pub fn context(&self) -> InstallContext {
        InstallContext::new(Arc::new(self.fs.clone()))
    }

    /// Install `url` through a registry backed by `service`.
    pub async fn install(
        &self,
        service: &MockRepositoryService,
        url: &str,
    ) -> InstallResult<Plugin> {
        self.install_with(&self.context(), service, url).await
    }

    pub async fn install_with(
        &self,
        ctx: &InstallContext,
        service: &MockRepositoryService,
        url: &str,
    ) -> InstallResult<Plugin> {
        let registry = registry(Arc::new(service.clone()), GithubOptions::default());
        registry.install(ctx, self.dest.path(), url).await
    }

    /// Path of the installed plugin directory.
    pub fn installed(&self, name: &str) -> std::path::PathBuf {
        self.dest.path().join(name)
    }

    /// Entries left directly under the destination.
    pub fn dest_entries(&self) -> usize {
        count_entries(self.dest.path())
    }

    /// Entries left directly under the temp root.
    pub fn temp_entries(&self) -> usize {
        count_entries(self.temp.path())
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

/// Permission bits of `path`.
#[cfg(unix)]
pub fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .expect("stat installed file")
        .permissions()
        .mode()
        & 0o777
}

//! The GitHub release installer and its registration.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pluginreg_core::{
    Fs, InstallContext, InstallError, InstallResult, Installer, InstallerRegistry, OsFs, Plugin,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::GithubClient;
use crate::error::{ErrorContext, GithubError, ServiceResult, Stage};
use crate::options::GithubOptions;
use crate::release::{fetch_metadata, resolve_release};
use crate::select::select_asset;
use crate::service::RepositoryService;
use crate::source::{is_plugin, parse};
use crate::staging;

/// Installs plugins from GitHub releases.
///
/// Resolves the release, fetches the plugin metadata at its tag, downloads
/// the asset declared for the running platform into a staging directory
/// and hands the staged path to the first matching installer of
/// `delegates`.
///
/// At most one install is in flight per instance; concurrent calls wait.
#[derive(Debug)]
pub struct GithubInstaller {
    fs: Arc<dyn Fs>,
    service: Arc<dyn RepositoryService>,
    delegates: Arc<InstallerRegistry>,
    options: GithubOptions,
    install_lock: Mutex<()>,
}

impl GithubInstaller {
    /// Create an installer using `service` with default options and the
    /// host filesystem.
    #[must_use]
    pub fn new(service: Arc<dyn RepositoryService>, delegates: Arc<InstallerRegistry>) -> Self {
        Self {
            fs: Arc::new(OsFs::new()),
            service,
            delegates,
            options: GithubOptions::default(),
            install_lock: Mutex::new(()),
        }
    }

    /// Create an installer talking to the GitHub API described by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn from_options(
        options: GithubOptions,
        delegates: Arc<InstallerRegistry>,
    ) -> ServiceResult<Self> {
        let service = Arc::new(GithubClient::new(&options)?);
        Ok(Self::new(service, delegates).with_options(options))
    }

    /// Replace the repository service.
    #[must_use]
    pub fn with_service(mut self, service: Arc<dyn RepositoryService>) -> Self {
        self.service = service;
        self
    }

    /// Replace the filesystem used for staging and handed to delegates.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn Fs>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: GithubOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &GithubOptions {
        &self.options
    }

    /// Whether `url` is a plugin URL on the configured host.
    #[must_use]
    pub fn accepts(&self, url: &str) -> bool {
        is_plugin(url, &self.options.hostname)
    }

    async fn run(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        url: &str,
    ) -> Result<Plugin, GithubError> {
        let mut context = ErrorContext::new(url);

        let source = parse(url, &self.options.hostname)
            .map_err(|e| GithubError::stage(Stage::ParseUrl, &context, e))?;
        context.owner.clone_from(&source.owner);
        context.repository.clone_from(&source.repository);

        let release = resolve_release(self.service.as_ref(), ctx, &source, &context).await?;
        let tag = release.tag_name.clone().unwrap_or_default();
        context.tag = Some(tag.clone());

        let plugin = fetch_metadata(
            self.service.as_ref(),
            ctx,
            &source,
            &tag,
            &self.options.hostname,
            &context,
        )
        .await?;

        let asset = select_asset(&plugin, &release)
            .map_err(|e| GithubError::stage(Stage::FindArtifact, &context, e))?;
        context.asset = Some((asset.id, asset.name.clone()));

        let download = self
            .service
            .download_release_asset(ctx, &source.owner, &source.repository, asset.id)
            .await
            .map_err(|e| GithubError::remote(Stage::DownloadArtifact, &context, e))?;

        let (staging_dir, dispatch) = staging::stage(
            &self.fs,
            ctx,
            &self.options.temp_prefix,
            asset,
            download,
            &plugin,
            &context,
        )
        .await?;

        let dispatch = dispatch.to_string_lossy();
        let delegate_ctx = ctx.clone().with_fs(Arc::clone(&self.fs));
        let delegate = self
            .delegates
            .find(&delegate_ctx, &dispatch)
            .map_err(GithubError::Dispatch)?;
        debug!(source = %dispatch, "dispatching staged artifact");

        let installed = delegate
            .install(&delegate_ctx, dest, &dispatch)
            .await
            .map_err(GithubError::Dispatch)?;
        drop(staging_dir);

        info!(
            plugin = %installed.name,
            version = %installed.version,
            dest = %dest.display(),
            "installed plugin from github"
        );
        Ok(installed)
    }
}

#[async_trait]
impl Installer for GithubInstaller {
    async fn install(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        source: &str,
    ) -> InstallResult<Plugin> {
        let _guard = ctx
            .run_until_cancelled(self.install_lock.lock())
            .await
            .ok_or(InstallError::Cancelled)?;

        self.run(ctx, dest, source).await.map_err(InstallError::from)
    }
}

/// Register the GitHub installer under the configured hostname, talking to
/// the API described by `options`. Staged artifacts are installed through
/// `delegates`.
///
/// # Errors
///
/// Returns an error if the API client cannot be built.
pub fn register(
    registry: &mut InstallerRegistry,
    options: GithubOptions,
    delegates: Arc<InstallerRegistry>,
) -> ServiceResult<()> {
    let service: Arc<dyn RepositoryService> = Arc::new(GithubClient::new(&options)?);
    register_with_service(registry, options, delegates, service);
    Ok(())
}

/// Register the GitHub installer with an explicit repository service.
pub fn register_with_service(
    registry: &mut InstallerRegistry,
    options: GithubOptions,
    delegates: Arc<InstallerRegistry>,
    service: Arc<dyn RepositoryService>,
) {
    let id = options.hostname.clone();
    let hostname = options.hostname.clone();

    registry.register(
        id,
        move |_ctx: &InstallContext, url: &str| is_plugin(url, &hostname),
        move |fs| {
            Arc::new(
                GithubInstaller::new(Arc::clone(&service), Arc::clone(&delegates))
                    .with_options(options.clone())
                    .with_fs(fs),
            ) as Arc<dyn Installer>
        },
    );
}

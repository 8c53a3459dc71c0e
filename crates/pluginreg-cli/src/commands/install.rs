//! `pluginreg install`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use pluginreg_config::Config;
use pluginreg_core::{InstallContext, InstallerRegistry, OsFs, Plugin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config_bridge::to_github_options;

/// Build the registry the CLI installs through: the GitHub source first,
/// then the local format installers. Staged GitHub artifacts are handed to
/// a separate registry holding only the format installers.
///
/// # Errors
///
/// Returns an error if the GitHub client cannot be built.
pub(crate) fn build_registry(config: &Config) -> anyhow::Result<InstallerRegistry> {
    let mut delegates = InstallerRegistry::new();
    pluginreg_fs::register(&mut delegates);

    let mut registry = InstallerRegistry::new();
    pluginreg_github::register(
        &mut registry,
        to_github_options(config),
        Arc::new(delegates),
    )
    .context("failed to initialize GitHub client")?;
    pluginreg_fs::register(&mut registry);

    debug!(installers = ?registry.identifiers(), "installer registry ready");
    Ok(registry)
}

/// Install `source` under `dest`, or the configured plugin directory.
pub(crate) async fn run(
    config: &Config,
    source: &str,
    dest: Option<PathBuf>,
) -> anyhow::Result<()> {
    let dest = match dest {
        Some(dest) => dest,
        None => config
            .plugin_dir()
            .context("failed to determine plugin directory")?,
    };
    std::fs::create_dir_all(&dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let registry = build_registry(config)?;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let result = install(&registry, cancel, &dest, source).await;
    watcher.abort();

    let plugin = result.with_context(|| format!("failed to install {source}"))?;
    info!(plugin = %plugin.name, "install complete");

    println!(
        "Installed {} {} to {}",
        plugin.name,
        display_version(&plugin),
        dest.join(&plugin.name).display()
    );
    Ok(())
}

async fn install(
    registry: &InstallerRegistry,
    cancel: CancellationToken,
    dest: &Path,
    source: &str,
) -> pluginreg_core::InstallResult<Plugin> {
    let ctx = InstallContext::new(Arc::new(OsFs::new())).with_cancellation(cancel);
    registry.install(&ctx, dest, source).await
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Cancelling...");
        cancel.cancel();
    }
}

fn display_version(plugin: &Plugin) -> &str {
    if plugin.version.is_empty() {
        "(unversioned)"
    } else {
        &plugin.version
    }
}

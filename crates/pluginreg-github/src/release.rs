//! Release resolution and metadata fetch.

use pluginreg_core::{InstallContext, METADATA_FILE, Plugin, decode_metadata};
use tracing::debug;

use crate::error::{ErrorContext, GithubError, Stage};
use crate::service::{Release, RepositoryService};
use crate::source::{SourceUrl, normalize_version};

/// Fetch the release `source` selects: the latest one when the version is
/// empty or `latest`, otherwise the one tagged exactly with the version.
///
/// The returned release always has a tag.
///
/// # Errors
///
/// Wraps remote failures with the stage prefix. A latest release without a
/// tag name is [`GithubError::MissingTagName`].
pub async fn resolve_release(
    service: &dyn RepositoryService,
    ctx: &InstallContext,
    source: &SourceUrl,
    context: &ErrorContext,
) -> Result<Release, GithubError> {
    if source.wants_latest() {
        debug!(owner = %source.owner, repository = %source.repository, "resolving latest release");

        let release = service
            .latest_release(ctx, &source.owner, &source.repository)
            .await
            .map_err(|e| GithubError::remote(Stage::LatestRelease, context, e))?;

        if release.tag_name.as_deref().is_none_or(str::is_empty) {
            return Err(GithubError::MissingTagName {
                context: Box::new(context.clone()),
            });
        }

        return Ok(release);
    }

    debug!(
        owner = %source.owner,
        repository = %source.repository,
        tag = %source.version,
        "resolving tagged release"
    );

    let mut release = service
        .release_by_tag(ctx, &source.owner, &source.repository, &source.version)
        .await
        .map_err(|e| GithubError::remote(Stage::ReleaseByTag, context, e))?;

    // The tag was asked for by name; pin to it if the service left it out.
    if release.tag_name.as_deref().is_none_or(str::is_empty) {
        release.tag_name = Some(source.version.clone());
    }

    Ok(release)
}

/// Fetch and decode the plugin metadata at `tag`, then overwrite the
/// derived fields: `version` becomes the normalized tag and `url` the
/// canonical repository URL.
///
/// # Errors
///
/// Wraps download failures with "could not get plugin metadata" and decode
/// failures (including an empty document) with "could not load plugin
/// metadata".
pub async fn fetch_metadata(
    service: &dyn RepositoryService,
    ctx: &InstallContext,
    source: &SourceUrl,
    tag: &str,
    hostname: &str,
    context: &ErrorContext,
) -> Result<Plugin, GithubError> {
    let data = service
        .download_contents(ctx, &source.owner, &source.repository, METADATA_FILE, tag)
        .await
        .map_err(|e| GithubError::remote(Stage::GetMetadata, context, e))?;

    let mut plugin =
        decode_metadata(&data).map_err(|e| GithubError::stage(Stage::LoadMetadata, context, e))?;

    plugin.version = normalize_version(tag).to_string();
    plugin.url = source.canonical_url(hostname);

    debug!(plugin = %plugin.name, version = %plugin.version, "loaded plugin metadata");
    Ok(plugin)
}

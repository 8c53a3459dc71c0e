//! Platform artifact selection.

use pluginreg_core::{Plugin, runtime_artifact_identifier};

use crate::error::ArtifactNotFound;
use crate::service::{Asset, Release};

/// The release asset declared for the running platform.
///
/// # Errors
///
/// Returns [`ArtifactNotFound`] if the plugin declares no artifact for this
/// platform, the release has no assets, or no asset has the declared name.
pub fn select_asset<'r>(
    plugin: &Plugin,
    release: &'r Release,
) -> Result<&'r Asset, ArtifactNotFound> {
    select_asset_for(plugin, release, &runtime_artifact_identifier())
}

/// The release asset declared for `platform` (`"<os>/<arch>"`).
///
/// # Errors
///
/// See [`select_asset`].
pub fn select_asset_for<'r>(
    plugin: &Plugin,
    release: &'r Release,
    platform: &str,
) -> Result<&'r Asset, ArtifactNotFound> {
    let artifact = plugin.resolve_artifact(platform).ok_or(ArtifactNotFound)?;
    find_asset(release, &artifact.file)
}

/// First asset named exactly `file`, in release order.
///
/// # Errors
///
/// Returns [`ArtifactNotFound`] if no asset matches.
pub fn find_asset<'r>(release: &'r Release, file: &str) -> Result<&'r Asset, ArtifactNotFound> {
    release
        .assets
        .iter()
        .find(|asset| asset.name == file)
        .ok_or(ArtifactNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(names: &[&str]) -> Release {
        names
            .iter()
            .zip(1u64..)
            .fold(Release::tagged("v1.0.0"), |r, (name, id)| {
                r.with_asset(Asset::new(id, *name, None))
            })
    }

    #[test]
    fn test_exact_name_match_only() {
        let release = release(&["my-plugin.tar.gz", "my-plugin.zip.sha256", "my-plugin.zip"]);

        assert_eq!(find_asset(&release, "my-plugin.zip").unwrap().id, 3);
        assert!(find_asset(&release, "my-plugin").is_err());
        assert!(find_asset(&release, "MY-PLUGIN.ZIP").is_err());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let release = release(&["a.zip", "a.zip"]);
        assert_eq!(find_asset(&release, "a.zip").unwrap().id, 1);
    }

    #[test]
    fn test_empty_release_is_not_found() {
        assert_eq!(
            find_asset(&Release::tagged("v1"), "a.zip").unwrap_err(),
            ArtifactNotFound
        );
    }

    #[test]
    fn test_selects_by_platform() {
        let plugin = Plugin::new("p")
            .with_artifact("linux/amd64", "p-linux.tar.gz")
            .with_artifact("darwin/arm64", "p-darwin.zip");
        let release = release(&["p-darwin.zip", "p-linux.tar.gz"]);

        assert_eq!(
            select_asset_for(&plugin, &release, "linux/amd64").unwrap().name,
            "p-linux.tar.gz"
        );
        assert_eq!(
            select_asset_for(&plugin, &release, "darwin/arm64").unwrap().name,
            "p-darwin.zip"
        );
        assert!(select_asset_for(&plugin, &release, "windows/386").is_err());
    }

    #[test]
    fn test_selects_for_running_platform() {
        let plugin = Plugin::new("p").with_artifact(runtime_artifact_identifier(), "p.zip");
        let release = release(&["p.zip"]);

        assert_eq!(select_asset(&plugin, &release).unwrap().name, "p.zip");
    }
}

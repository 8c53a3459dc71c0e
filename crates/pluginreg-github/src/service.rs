//! Remote repository-release service consumed by the installer.

use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use pluginreg_core::InstallContext;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// A tagged release and its downloadable assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tag the release points at. The latest-release endpoint may omit it.
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Assets in the order the service returned them.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Create a release for `tag` with no assets.
    #[must_use]
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag_name: Some(tag.into()),
            assets: Vec::new(),
        }
    }

    /// Append an asset.
    #[must_use]
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }
}

/// One downloadable file of a release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Service-assigned identifier used to download the asset.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Declared content type.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Asset {
    /// Create an asset.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, content_type: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Byte stream of a downloading asset.
pub type AssetStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Release operations of a code-hosting service.
///
/// Implementations observe the context's cancellation token on every call
/// and fail with [`ServiceError::Cancelled`](crate::ServiceError::Cancelled)
/// when it fires. Nothing is retried.
#[async_trait]
pub trait RepositoryService: Send + Sync + fmt::Debug {
    /// The latest published release.
    async fn latest_release(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
    ) -> ServiceResult<Release>;

    /// The release tagged exactly `tag`.
    async fn release_by_tag(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        tag: &str,
    ) -> ServiceResult<Release>;

    /// Raw contents of the file at `path` as of `git_ref`.
    async fn download_contents(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> ServiceResult<Vec<u8>>;

    /// Start downloading a release asset, following redirects to wherever
    /// the bytes are stored.
    async fn download_release_asset(
        &self,
        ctx: &InstallContext,
        owner: &str,
        repository: &str,
        asset_id: u64,
    ) -> ServiceResult<AssetStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_api_release() {
        let json = r#"{
            "tag_name": "v1.4.2",
            "name": "v1.4.2",
            "assets": [
                {"id": 42, "name": "my-plugin.zip", "content_type": "application/zip", "size": 10},
                {"id": 43, "name": "checksums.txt"}
            ]
        }"#;

        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name.as_deref(), Some("v1.4.2"));
        assert_eq!(
            release.assets,
            vec![
                Asset::new(42, "my-plugin.zip", Some("application/zip")),
                Asset::new(43, "checksums.txt", None),
            ]
        );
    }

    #[test]
    fn test_missing_tag_decodes_as_none() {
        let release: Release = serde_json::from_str(r#"{"tag_name": null}"#).unwrap();
        assert_eq!(release, Release::default());
    }
}

//! GitHub release plugin source for pluginreg.
//!
//! Installs plugins published as GitHub releases:
//!
//! - [`parse`] / [`is_plugin`]: the `<host>/<owner>/<repo>[@<version>]` URL grammar
//! - [`resolve_release`]: latest or tagged release lookup
//! - [`fetch_metadata`]: the plugin metadata at the release tag
//! - [`select_asset`]: the release asset for the running platform
//! - [`staging`]: the download-to-temp-directory step and its permission policy
//! - [`GithubInstaller`]: the pipeline, handing the staged artifact to a
//!   delegate installer
//!
//! # Pipeline
//!
//! ```text
//! parse url -> resolve release -> fetch metadata -> select asset
//!   -> download -> stage (asset + metadata) -> delegate install -> cleanup
//! ```
//!
//! Every step failure carries a stable message prefix (see [`Stage`]) and
//! the staging directory is removed whatever the outcome.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod error;
mod installer;
pub mod options;
pub mod release;
pub mod select;
pub mod service;
pub mod source;
pub mod staging;

#[cfg(test)]
mod test_support;

pub use client::GithubClient;
pub use error::{
    ArtifactNotFound, ErrorContext, GithubError, ParseError, ServiceError, ServiceResult, Stage,
};
pub use installer::{GithubInstaller, register, register_with_service};
pub use options::GithubOptions;
pub use release::{fetch_metadata, resolve_release};
pub use select::select_asset;
pub use service::{Asset, AssetStream, Release, RepositoryService};
pub use source::{GITHUB_HOSTNAME, SourceUrl, is_plugin, normalize_version, parse};
pub use staging::{StagingDir, chmod_artifact, dispatch_path};

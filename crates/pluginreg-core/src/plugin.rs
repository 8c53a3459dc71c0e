//! Plugin descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the metadata file every plugin carries at its root.
pub const METADATA_FILE: &str = ".plugin.registry.yaml";

/// Per-platform artifacts, keyed by `"<os>/<arch>"`.
pub type Artifacts = BTreeMap<String, Artifact>;

/// A downloadable artifact for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Expected file name of the release asset.
    #[serde(default)]
    pub file: String,
}

impl Artifact {
    /// Create an artifact entry for the given file name.
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}

/// Plugin descriptor as stored in [`METADATA_FILE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// Plugin name. Also the name of its installation directory.
    #[serde(default)]
    pub name: String,
    /// Canonical source URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Installed version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Whether the plugin is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Whether the plugin is hidden from listings.
    #[serde(default)]
    pub hidden: bool,
    /// Per-platform artifacts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: Artifacts,
}

impl Plugin {
    /// Create a descriptor with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an artifact entry for a platform identifier.
    #[must_use]
    pub fn with_artifact(mut self, platform: impl Into<String>, file: impl Into<String>) -> Self {
        self.artifacts.insert(platform.into(), Artifact::new(file));
        self
    }

    /// Identifier of the running platform, see [`runtime_artifact_identifier`].
    #[must_use]
    pub fn runtime_artifact(&self) -> String {
        runtime_artifact_identifier()
    }

    /// Look up the artifact declared for a platform identifier.
    #[must_use]
    pub fn resolve_artifact(&self, platform: &str) -> Option<&Artifact> {
        self.artifacts.get(platform)
    }
}

/// Identifier of the running platform, formatted as `"<os>/<arch>"`.
///
/// Uses the naming plugin authors already publish under (`linux/amd64`,
/// `darwin/arm64`, `windows/386`) rather than Rust target names.
#[must_use]
pub fn runtime_artifact_identifier() -> String {
    platform_identifier(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_identifier(os: &str, arch: &str) -> String {
    let os = match os {
        "macos" => "darwin",
        other => other,
    };
    let arch = match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    };
    format!("{os}/{arch}")
}

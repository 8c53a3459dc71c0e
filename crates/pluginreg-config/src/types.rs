//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API and release source settings.
    pub github: GithubSection,
    /// Logging level and format.
    pub log: LogSection,
    /// Where plugins are installed.
    pub install: InstallSection,
}

// ---------------------------------------------------------------------------
// GithubSection
// ---------------------------------------------------------------------------

/// GitHub API and release source settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    /// Hostname plugin URLs are anchored at (`github.com`, or a GitHub
    /// Enterprise host).
    pub hostname: String,
    /// REST API base URL.
    pub api_url: String,
    /// API token. Prefer the environment over storing this in a file.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// `User-Agent` sent with API requests.
    pub user_agent: String,
    /// Prefix of staging directory names.
    pub temp_prefix: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Redirects followed when downloading assets.
    pub max_redirects: usize,
}

impl std::fmt::Debug for GithubSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSection")
            .field("hostname", &self.hostname)
            .field("api_url", &self.api_url)
            .field("has_token", &self.token.is_some())
            .field("user_agent", &self.user_agent)
            .field("temp_prefix", &self.temp_prefix)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl Serialize for GithubSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GithubSection", 6)?;
        state.serialize_field("hostname", &self.hostname)?;
        state.serialize_field("api_url", &self.api_url)?;
        // token is omitted.
        state.serialize_field("user_agent", &self.user_agent)?;
        state.serialize_field("temp_prefix", &self.temp_prefix)?;
        state.serialize_field("connect_timeout_secs", &self.connect_timeout_secs)?;
        state.serialize_field("max_redirects", &self.max_redirects)?;
        state.end()
    }
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            hostname: "github.com".to_owned(),
            api_url: "https://api.github.com/".to_owned(),
            token: None,
            user_agent: "pluginreg".to_owned(),
            temp_prefix: "plugin-registry-github-".to_owned(),
            connect_timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// LogSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["pluginreg_github=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// InstallSection
// ---------------------------------------------------------------------------

/// Installation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Directory plugins are installed under. Defaults to the per-user data
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<PathBuf>,
}

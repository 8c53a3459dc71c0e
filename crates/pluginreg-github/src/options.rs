//! Settings for the GitHub client and installer.

use std::time::Duration;

use crate::source::GITHUB_HOSTNAME;

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Default staging directory prefix.
pub const DEFAULT_TEMP_PREFIX: &str = "plugin-registry-github-";

/// Settings for the GitHub source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubOptions {
    /// Hostname plugin URLs are anchored at. Also the registry identifier.
    pub hostname: String,
    /// REST API base URL.
    pub api_url: String,
    /// Bearer token sent with API requests.
    pub token: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Prefix of staging directory names.
    pub temp_prefix: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Redirects followed when downloading assets.
    pub max_redirects: usize,
}

impl Default for GithubOptions {
    fn default() -> Self {
        Self {
            hostname: GITHUB_HOSTNAME.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            user_agent: concat!("pluginreg/", env!("CARGO_PKG_VERSION")).to_string(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

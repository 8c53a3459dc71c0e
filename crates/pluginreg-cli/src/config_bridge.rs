//! Conversion from `pluginreg_config::Config` to installer and logging types.

use std::time::Duration;

use pluginreg_config::Config;
use pluginreg_github::GithubOptions;
use pluginreg_telemetry::{LogConfig, LogFormat};

/// Logging settings from the `[log]` section.
///
/// An unrecognized format falls back to compact; validation has already
/// rejected anything else by the time a config is loaded.
#[must_use]
pub(crate) fn to_log_config(config: &Config) -> LogConfig {
    let format = config.log.format.parse().unwrap_or(LogFormat::Compact);
    let mut log = LogConfig::new(config.log.level.clone()).with_format(format);
    log.directives.clone_from(&config.log.directives);
    log
}

/// GitHub source settings from the `[github]` section.
#[must_use]
pub(crate) fn to_github_options(config: &Config) -> GithubOptions {
    let g = &config.github;
    GithubOptions {
        hostname: g.hostname.clone(),
        api_url: g.api_url.clone(),
        token: g.token.clone(),
        user_agent: g.user_agent.clone(),
        temp_prefix: g.temp_prefix.clone(),
        connect_timeout: Duration::from_secs(g.connect_timeout_secs),
        max_redirects: g.max_redirects,
    }
}

//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_github(config)?;
    validate_log(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_github(config: &Config) -> ConfigResult<()> {
    let g = &config.github;

    if g.hostname.trim().is_empty() {
        return Err(invalid("github.hostname", "hostname must not be empty"));
    }
    if g.hostname.contains('/') {
        return Err(invalid(
            "github.hostname",
            format!("'{}' is not a bare hostname", g.hostname),
        ));
    }

    if !(g.api_url.starts_with("https://") || g.api_url.starts_with("http://")) {
        return Err(invalid(
            "github.api_url",
            format!("'{}' must be an http or https URL", g.api_url),
        ));
    }

    if g.max_redirects == 0 {
        return Err(invalid(
            "github.max_redirects",
            "max_redirects must be at least 1",
        ));
    }

    if g.temp_prefix.contains(['/', '\\']) {
        return Err(invalid(
            "github.temp_prefix",
            "temp_prefix must not contain path separators",
        ));
    }

    Ok(())
}

fn validate_log(config: &Config) -> ConfigResult<()> {
    let l = &config.log;

    if !matches!(
        l.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "log.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "log.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_hostname_rejected() {
        let mut config = Config::default();
        config.github.hostname = "  ".to_owned();
        assert_eq!(field_of(validate(&config)), "github.hostname");
    }

    #[test]
    fn test_hostname_with_path_rejected() {
        let mut config = Config::default();
        config.github.hostname = "github.com/owner".to_owned();
        assert_eq!(field_of(validate(&config)), "github.hostname");
    }

    #[test]
    fn test_non_http_api_url_rejected() {
        let mut config = Config::default();
        config.github.api_url = "ftp://api.github.com/".to_owned();
        assert_eq!(field_of(validate(&config)), "github.api_url");
    }

    #[test]
    fn test_zero_redirects_rejected() {
        let mut config = Config::default();
        config.github.max_redirects = 0;
        assert_eq!(field_of(validate(&config)), "github.max_redirects");
    }

    #[test]
    fn test_temp_prefix_with_separator_rejected() {
        let mut config = Config::default();
        config.github.temp_prefix = "../escape-".to_owned();
        assert_eq!(field_of(validate(&config)), "github.temp_prefix");
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.log.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "log.level");
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = Config::default();
        config.log.format = "full".to_owned();
        assert_eq!(field_of(validate(&config)), "log.format");
    }
}

//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` as the base
//! 2. Merge the user file (`<config dir>/pluginreg/config.toml`), if present
//! 3. Merge the explicit `--config` file, which must exist
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Directory name under the platform config and data directories.
const APP_DIR: &str = "pluginreg";

/// A loaded configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layer that set each leaf field, keyed by dotted path.
    pub field_sources: FieldSources,
    /// Files that were merged, in load order.
    pub loaded_files: Vec<String>,
}

/// Load the configuration from the user file, `explicit` and the process
/// environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the home directory cannot be determined, a
/// config file is malformed, `explicit` cannot be read, or the merged
/// configuration fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let user_path = user_config_path()?;
    load_from(Some(&user_path), explicit, &collect_env_vars())
}

/// Load with an explicit user file location and environment snapshot.
///
/// A missing user file is skipped; a missing `explicit` file is an error.
///
/// # Errors
///
/// See [`load`].
pub fn load_from<S: ::std::hash::BuildHasher>(
    user_path: Option<&Path>,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Location of the per-user config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the platform directories cannot be
/// determined.
pub fn user_config_path() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.config_dir().join(APP_DIR).join("config.toml"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Default plugin directory, under the per-user data directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the platform directories cannot be
/// determined.
pub fn default_plugin_dir() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.data_dir().join(APP_DIR).join("plugins"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_match_default_impl() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_without_files() {
        let resolved = load_from(None, None, &no_env()).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("github.hostname"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_missing_user_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_from(Some(&dir.path().join("config.toml")), None, &no_env()).unwrap();
        assert!(resolved.loaded_files.is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from(None, Some(&dir.path().join("nope.toml")), &no_env());
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_explicit_file_overrides_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = write(
            dir.path(),
            "user.toml",
            "[github]\nhostname = \"ghe.example.com\"\nmax_redirects = 3\n",
        );
        let explicit = write(dir.path(), "explicit.toml", "[github]\nmax_redirects = 5\n");

        let resolved = load_from(Some(&user), Some(&explicit), &no_env()).unwrap();

        assert_eq!(resolved.config.github.hostname, "ghe.example.com");
        assert_eq!(resolved.config.github.max_redirects, 5);
        assert_eq!(resolved.config.github.api_url, "https://api.github.com/");
        assert_eq!(
            resolved.field_sources.get("github.max_redirects"),
            Some(&ConfigLayer::Explicit)
        );
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_env_fills_token() {
        let env: HashMap<String, String> =
            [("GITHUB_TOKEN".to_owned(), "ghp_secret".to_owned())].into();

        let resolved = load_from(None, None, &env).unwrap();

        assert_eq!(resolved.config.github.token.as_deref(), Some("ghp_secret"));
        assert_eq!(
            resolved.field_sources.get("github.token"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_plugin_dir() {
        let env: HashMap<String, String> =
            [("PLUGINREG_PLUGIN_DIR".to_owned(), "/opt/plugins".to_owned())].into();

        let resolved = load_from(None, None, &env).unwrap();

        assert_eq!(
            resolved.config.install.plugin_dir.as_deref(),
            Some(Path::new("/opt/plugins"))
        );
    }

    #[test]
    fn test_invalid_merged_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "c.toml", "[github]\nmax_redirects = 0\n");

        let result = load_from(None, Some(&explicit), &no_env());

        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "c.toml", "[github\n");

        let result = load_from(None, Some(&explicit), &no_env());

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        let path = write(dir.path(), "huge.toml", &data);

        let result = try_load_file(&path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }

    #[test]
    fn test_github_section_debug_redacts_token() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".to_owned());

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("ghp_secret"));
        assert!(debug_str.contains("has_token: true"));
    }

    #[test]
    fn test_github_section_serialize_omits_token() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".to_owned());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(!json.contains("token"));
    }
}

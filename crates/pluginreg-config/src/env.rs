//! Environment variable fallbacks.
//!
//! Environment variables are fallbacks, not overrides: they only apply to
//! fields no config file set. Mappings are scanned in order, so the first
//! variable present for a field wins.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLUGINREG_GITHUB_TOKEN",
        field_path: "github.token",
    },
    EnvMapping {
        var_name: "GITHUB_TOKEN",
        field_path: "github.token",
    },
    EnvMapping {
        var_name: "PLUGINREG_GITHUB_API_URL",
        field_path: "github.api_url",
    },
    EnvMapping {
        var_name: "PLUGINREG_LOG_LEVEL",
        field_path: "log.level",
    },
    EnvMapping {
        var_name: "PLUGINREG_PLUGIN_DIR",
        field_path: "install.plugin_dir",
    },
];

/// Snapshot of the variables the config layer reads.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    ENV_MAPPINGS
        .iter()
        .filter_map(|m| {
            std::env::var(m.var_name)
                .ok()
                .map(|v| (m.var_name.to_owned(), v))
        })
        .collect()
}

/// Apply environment variable fallbacks to fields that were not set by any
/// config file layer. Empty values are ignored.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted `section.key` string field, creating the section if needed.
fn set_field(root: &mut toml::Value, path: &str, val: &str) {
    let Some((section, key)) = path.split_once('.') else {
        return;
    };
    let Some(root) = root.as_table_mut() else {
        return;
    };

    let table = root
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(table) = table.as_table_mut() {
        table.insert(key.to_owned(), toml::Value::String(val.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn empty_tree() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn test_fallback_fills_unset_fields() {
        let mut merged = empty_tree();
        let mut sources = FieldSources::new();

        let count = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[
                ("PLUGINREG_GITHUB_API_URL", "https://ghe.example.com/api/v3/"),
                ("PLUGINREG_PLUGIN_DIR", "/opt/plugins"),
            ]),
        );

        assert_eq!(count, 2);
        assert_eq!(
            merged["github"]["api_url"].as_str(),
            Some("https://ghe.example.com/api/v3/")
        );
        assert_eq!(merged["install"]["plugin_dir"].as_str(), Some("/opt/plugins"));
        assert_eq!(
            sources.get("install.plugin_dir"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_file_values_win_over_env() {
        let mut merged: toml::Value = toml::from_str("[log]\nlevel = \"warn\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("log.level".to_owned(), ConfigLayer::User);

        let count = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("PLUGINREG_LOG_LEVEL", "trace")]),
        );

        assert_eq!(count, 0);
        assert_eq!(merged["log"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_env_wins_over_defaults() {
        let mut merged: toml::Value = toml::from_str("[log]\nlevel = \"info\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("log.level".to_owned(), ConfigLayer::Defaults);

        apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("PLUGINREG_LOG_LEVEL", "debug")]),
        );

        assert_eq!(merged["log"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_prefixed_token_wins_over_generic() {
        let mut merged = empty_tree();
        let mut sources = FieldSources::new();

        apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("GITHUB_TOKEN", "generic"), ("PLUGINREG_GITHUB_TOKEN", "specific")]),
        );

        assert_eq!(merged["github"]["token"].as_str(), Some("specific"));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let mut merged = empty_tree();
        let mut sources = FieldSources::new();

        let count = apply_env_fallbacks(
            &mut merged,
            &mut sources,
            &env(&[("GITHUB_TOKEN", "")]),
        );

        assert_eq!(count, 0);
        assert!(merged.get("github").is_none());
    }
}

//! `pluginreg resolve`.

use std::fmt::Write as _;

use pluginreg_config::Config;
use pluginreg_github::{ParseError, SourceUrl, parse};
use serde::Serialize;

/// What a plugin URL points at.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Resolution {
    github_plugin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Resolution {
    fn new(url: &str, hostname: &str) -> Self {
        match parse(url, hostname) {
            Ok(source) => Self::found(&source, hostname),
            Err(e) => Self::not_found(&e),
        }
    }

    fn found(source: &SourceUrl, hostname: &str) -> Self {
        let version = if source.wants_latest() {
            "latest".to_owned()
        } else {
            source.version.clone()
        };
        Self {
            github_plugin: true,
            owner: Some(source.owner.clone()),
            repository: Some(source.repository.clone()),
            version: Some(version),
            canonical_url: Some(source.canonical_url(hostname)),
            error: None,
        }
    }

    fn not_found(err: &ParseError) -> Self {
        Self {
            github_plugin: false,
            owner: None,
            repository: None,
            version: None,
            canonical_url: None,
            error: Some(err.to_string()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = format!(
            "github plugin: {}\n",
            if self.github_plugin { "yes" } else { "no" }
        );
        for (label, value) in [
            ("owner", &self.owner),
            ("repository", &self.repository),
            ("version", &self.version),
            ("url", &self.canonical_url),
            ("error", &self.error),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "{label}: {value}");
            }
        }
        out
    }
}

/// Print how `url` parses against the configured hostname.
pub(crate) fn run(config: &Config, url: &str, json: bool) -> anyhow::Result<()> {
    let resolution = Resolution::new(url, &config.github.hostname);

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print!("{}", resolution.render_text());
    }
    Ok(())
}

//! GitHub plugin URL grammar.
//!
//! Accepted form: `[http[s]://][www.]<host>/<owner>/<repository>[@<version>]`.
//! An absent version, an empty one (`owner/repo@`) and the literal `latest`
//! all select the latest release; anything else is an exact tag.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;

/// Default GitHub hostname.
pub const GITHUB_HOSTNAME: &str = "github.com";

/// Version selector meaning "the latest release".
pub const LATEST: &str = "latest";

static SEMVER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[vV][0-9]+\.[0-9]+(\.[0-9]+)?").expect("invalid regex"));

/// Owner, repository and version selector parsed from a plugin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name. Nested paths are kept verbatim.
    pub repository: String,
    /// Version selector, empty when none was given.
    pub version: String,
}

impl SourceUrl {
    /// Whether the version selector asks for the latest release.
    #[must_use]
    pub fn wants_latest(&self) -> bool {
        self.version.is_empty() || self.version == LATEST
    }

    /// `https://<hostname>/<owner>/<repository>`.
    #[must_use]
    pub fn canonical_url(&self, hostname: &str) -> String {
        format!("https://{hostname}/{}/{}", self.owner, self.repository)
    }

    /// Format back into the URL grammar, without a scheme.
    #[must_use]
    pub fn format(&self, hostname: &str) -> String {
        if self.version.is_empty() {
            format!("{hostname}/{}/{}", self.owner, self.repository)
        } else {
            format!(
                "{hostname}/{}/{}@{}",
                self.owner, self.repository, self.version
            )
        }
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(GITHUB_HOSTNAME))
    }
}

/// Parse a plugin URL hosted on `hostname`.
///
/// # Errors
///
/// Returns [`ParseError::NotGithub`] if the URL is not anchored at
/// `hostname`, [`ParseError::MissingOwner`] or
/// [`ParseError::MissingRepository`] if either path segment is empty.
pub fn parse(url: &str, hostname: &str) -> Result<SourceUrl, ParseError> {
    let (location, version) = url.split_once('@').unwrap_or((url, ""));

    let path = strip_hostname(strip_scheme(location), hostname).ok_or(ParseError::NotGithub)?;
    let path = path.strip_prefix('/').unwrap_or(path);

    let (owner, repository) = path.split_once('/').unwrap_or((path, ""));
    let repository = repository.trim_matches('/');

    if owner.is_empty() {
        return Err(ParseError::MissingOwner);
    }
    if repository.is_empty() {
        return Err(ParseError::MissingRepository);
    }

    Ok(SourceUrl {
        owner: owner.to_string(),
        repository: repository.to_string(),
        version: version.to_string(),
    })
}

/// Whether [`parse`] accepts `url`.
#[must_use]
pub fn is_plugin(url: &str, hostname: &str) -> bool {
    parse(url, hostname).is_ok()
}

/// Strip a leading `v`/`V` from a semver-like tag (`v1.2`, `V1.2.3`).
///
/// Anything else is returned unchanged, so `master`, `v` and `volley` pass
/// through.
#[must_use]
pub fn normalize_version(version: &str) -> &str {
    if SEMVER_PREFIX.is_match(version) {
        &version[1..]
    } else {
        version
    }
}

fn strip_scheme(url: &str) -> &str {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.strip_prefix("www.").unwrap_or(url)
}

/// The remainder after `hostname`, which must end at a `/` or the end of
/// the string. Hostnames compare case-insensitively.
fn strip_hostname<'a>(url: &'a str, hostname: &str) -> Option<&'a str> {
    if hostname.is_empty() || !url.is_char_boundary(hostname.len()) {
        return None;
    }

    let (host, rest) = url.split_at(hostname.len());
    if !host.eq_ignore_ascii_case(hostname) {
        return None;
    }
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }

    Some(rest)
}

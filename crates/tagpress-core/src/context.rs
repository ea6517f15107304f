//! Repository metadata supplied by the CI environment.
//!
//! GitHub Actions describes the triggering push through `GITHUB_*`
//! variables. [`RepositoryContext`] reads and validates them once at
//! startup so the rest of the run never touches ambient process state.

use std::fmt;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{ConfigError, ConfigResult};

/// Tags must be `vX.Y.Z` or `X.Y.Z`, optionally followed by
/// pre-release/build metadata.
const STRICT_REF_PATTERN: &str = r"^refs/tags/(v?([0-9]+\.[0-9]+\.[0-9]+(?:[-+][0-9A-Za-z.+-]*)?))$";

/// Any prefix may precede the version triplet (e.g. `release-1.2.3`).
const PREFIXED_REF_PATTERN: &str =
    r"^refs/tags/(.*?([0-9]+\.[0-9]+\.[0-9]+(?:[-+][0-9A-Za-z.+-]*)?))$";

const REPOSITORY_PATTERN: &str = r"^([^/\s]+)/([^/\s]+)$";

static STRICT_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(STRICT_REF_PATTERN).unwrap());
static PREFIXED_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PREFIXED_REF_PATTERN).unwrap());
static REPOSITORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(REPOSITORY_PATTERN).unwrap());

/// Validated metadata about the repository and the tag being released.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryContext {
    /// API token handed to the hosting service client.
    pub token: String,
    /// The full tag name (e.g. `v1.2.3`).
    pub tag: String,
    /// The version extracted from the tag (e.g. `1.2.3`).
    pub version: String,
    /// The commit the tag points at.
    pub commit: String,
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub project: String,
    /// Checkout directory, when the CI runner reports one.
    pub workspace: Option<Utf8PathBuf>,
    /// Base URL of the hosting service (e.g. `https://github.com`).
    pub server_url: Option<String>,
}

impl fmt::Debug for RepositoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryContext")
            .field("token", &"<redacted>")
            .field("tag", &self.tag)
            .field("version", &self.version)
            .field("commit", &self.commit)
            .field("owner", &self.owner)
            .field("project", &self.project)
            .field("workspace", &self.workspace)
            .field("server_url", &self.server_url)
            .finish()
    }
}

impl RepositoryContext {
    /// Read the context from the process environment.
    pub fn from_env(allow_tag_prefix: bool) -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), allow_tag_prefix)
    }

    /// Read the context through an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    #[instrument(skip(lookup))]
    pub fn from_lookup<F>(lookup: F, allow_tag_prefix: bool) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| read_var(&lookup, key);

        let token = get("GITHUB_TOKEN").ok_or(ConfigError::MissingSecret {
            name: "GITHUB_TOKEN",
        })?;

        let (owner, project) = parse_repository(get("GITHUB_REPOSITORY"))?;

        let commit = get("GITHUB_SHA").ok_or(ConfigError::MissingVar { name: "GITHUB_SHA" })?;

        let (tag, version) = tag_from_lookup(&lookup, allow_tag_prefix)?;

        let context = Self {
            token,
            tag,
            version,
            commit,
            owner,
            project,
            workspace: get("GITHUB_WORKSPACE").map(Utf8PathBuf::from),
            server_url: get("GITHUB_SERVER_URL"),
        };
        debug!(?context, "repository context resolved");
        Ok(context)
    }

    /// The `owner/name` slug.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.project)
    }

    /// Host name of the hosting service, if it is not the public default.
    ///
    /// `https://github.example.com/` yields `github.example.com`.
    pub fn host(&self) -> Option<String> {
        let url = self.server_url.as_deref()?;
        let host = url
            .split_once("://")
            .map_or(url, |(_, rest)| rest)
            .trim_end_matches('/');
        if host.is_empty() || host == "github.com" {
            None
        } else {
            Some(host.to_string())
        }
    }
}

/// Read `key` through `lookup`, treating blank values as missing.
fn read_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The pushed tag and its version, read from `GITHUB_REF` alone.
///
/// # Errors
///
/// Same as [`parse_tag_ref`].
pub fn tag_from_lookup<F>(lookup: F, allow_tag_prefix: bool) -> ConfigResult<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    parse_tag_ref(read_var(&lookup, "GITHUB_REF"), allow_tag_prefix)
}

/// The directory release files are resolved against.
///
/// This is `GITHUB_WORKSPACE` when the runner sets it, otherwise `fallback`.
pub fn workspace_root<F>(lookup: F, fallback: &Utf8Path) -> Utf8PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    read_var(&lookup, "GITHUB_WORKSPACE").map_or_else(|| fallback.to_path_buf(), Utf8PathBuf::from)
}

/// Split `GITHUB_REPOSITORY` into owner and project.
fn parse_repository(value: Option<String>) -> ConfigResult<(String, String)> {
    let value = value.ok_or(ConfigError::MissingVar {
        name: "GITHUB_REPOSITORY",
    })?;
    let caps = REPOSITORY
        .captures(&value)
        .ok_or_else(|| ConfigError::MalformedVar {
            name: "GITHUB_REPOSITORY",
            pattern: REPOSITORY_PATTERN.to_string(),
            value: value.clone(),
        })?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// Extract `(tag, version)` from a `GITHUB_REF` value.
///
/// ```
/// use tagpress_core::context::parse_tag_ref;
///
/// let (tag, version) = parse_tag_ref(Some("refs/tags/v1.2.3".into()), false).unwrap();
/// assert_eq!((tag.as_str(), version.as_str()), ("v1.2.3", "1.2.3"));
/// ```
///
/// # Errors
///
/// Fails when the value is missing, is not a tag ref, or holds no version
/// triplet in the accepted position.
pub fn parse_tag_ref(
    value: Option<String>,
    allow_tag_prefix: bool,
) -> ConfigResult<(String, String)> {
    let value = value.ok_or(ConfigError::MissingVar { name: "GITHUB_REF" })?;
    let (re, pattern) = if allow_tag_prefix {
        (&*PREFIXED_REF, PREFIXED_REF_PATTERN)
    } else {
        (&*STRICT_REF, STRICT_REF_PATTERN)
    };
    let caps = re.captures(&value).ok_or_else(|| ConfigError::MalformedVar {
        name: "GITHUB_REF",
        pattern: pattern.to_string(),
        value: value.clone(),
    })?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

//! Configuration loading and discovery.
//!
//! Configuration is assembled once at startup from, in order of increasing
//! precedence:
//! 1. Built-in defaults
//! 2. User config from the XDG config directory
//! 3. Project config found by walking up from the current directory
//! 4. Explicit files (`--config`)
//! 5. Environment variables (`ALLOW_EMPTY_CHANGELOG`, ... and their
//!    GitHub Actions `INPUT_` counterparts)
//!
//! # Supported formats
//!
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.tagpress.<ext>` in current directory or any parent
//! - `tagpress.<ext>` in current directory or any parent
//! - `~/.config/tagpress/config.<ext>` (user config)
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use tagpress_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! assert!(!config.changelog_file.is_empty());
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use figment::value::{Dict, Value};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Changelog file name that disables changelog processing entirely.
pub const CHANGELOG_DISABLED: &str = "none";

/// Default changelog location, relative to the workspace.
pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

/// The configuration for tagpress.
///
/// Immutable once loaded; passed by reference into the release planner.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files.
    pub log_dir: Option<Utf8PathBuf>,
    /// Changelog path relative to the workspace, or `none` to skip it.
    pub changelog_file: String,
    /// Skip changelog processing even when a changelog file is configured.
    pub ignore_changelog: bool,
    /// Publish even when no release notes were found for the version.
    pub allow_empty_changelog: bool,
    /// Accept arbitrary tag prefixes (e.g. `release-1.2.3`), not just `v`.
    pub allow_tag_prefix: bool,
    /// Create the release as a draft.
    pub draft_release: bool,
    /// Mark the release as a pre-release.
    pub pre_release: bool,
    /// Release title; overrides the prefix/suffix scheme.
    pub release_name: Option<String>,
    /// Text placed before the tag in the release title.
    pub release_name_prefix: Option<String>,
    /// Text placed after the tag in the release title.
    pub release_name_suffix: Option<String>,
    /// Asset patterns (literal paths or globs) to attach to every release.
    pub assets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            changelog_file: DEFAULT_CHANGELOG.to_string(),
            ignore_changelog: false,
            allow_empty_changelog: false,
            allow_tag_prefix: false,
            draft_release: false,
            pre_release: false,
            release_name: None,
            release_name_prefix: None,
            release_name_suffix: None,
            assets: Vec::new(),
        }
    }
}

impl Config {
    /// Whether changelog processing is switched off.
    pub fn changelog_disabled(&self) -> bool {
        self.ignore_changelog || self.changelog_file.trim() == CHANGELOG_DISABLED
    }

    /// Resolve the changelog path against the workspace root.
    ///
    /// Returns `None` when changelog processing is disabled.
    pub fn changelog_path(&self, workspace: &Utf8Path) -> Option<Utf8PathBuf> {
        if self.changelog_disabled() {
            return None;
        }
        Some(workspace.join(self.changelog_file.trim()))
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "tagpress";

/// Prefix GitHub Actions puts in front of workflow `with:` inputs.
const ACTION_INPUT_PREFIX: &str = "INPUT_";

/// Boolean settings readable from the environment.
const ENV_FLAGS: &[&str] = &[
    "ALLOW_EMPTY_CHANGELOG",
    "ALLOW_TAG_PREFIX",
    "DRAFT_RELEASE",
    "PRE_RELEASE",
    "IGNORE_CHANGELOG",
];

/// String settings readable from the environment.
const ENV_STRINGS: &[&str] = &[
    "CHANGELOG_FILE",
    "RELEASE_NAME",
    "RELEASE_NAME_PREFIX",
    "RELEASE_NAME_SUFFIX",
];

/// Where environment overrides come from.
#[derive(Debug, Default)]
enum EnvSource {
    /// Read from the process environment at load time.
    #[default]
    Process,
    /// A fixed set of variables (for testing or programmatic use).
    Fixed(BTreeMap<String, String>),
    /// Ignore the environment.
    Disabled,
}

impl EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
            Self::Disabled => None,
        }
    }
}

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
    /// Environment overrides.
    env: EnvSource,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
            env: EnvSource::Process,
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/tagpress/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Use a fixed set of environment variables instead of the process
    /// environment.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Ignore environment variables entirely.
    pub fn without_env(mut self) -> Self {
        self.env = EnvSource::Disabled;
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables (`INPUT_`-prefixed first)
    /// 2. Explicit files (in order added via `with_file`)
    /// 3. Project config (closest to search root)
    /// 4. User config (`~/.config/tagpress/config.<ext>`)
    /// 5. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Start with user config (lowest precedence of file sources)
        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        // Add project config
        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        // Add explicit files
        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        // Environment overrides everything
        let overrides = self.env_overrides()?;
        if !overrides.is_empty() {
            tracing::debug!(keys = ?overrides.keys().collect::<Vec<_>>(), "environment overrides");
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            changelog = %config.changelog_file,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Collect environment overrides as a figment dictionary.
    ///
    /// Empty values are treated as unset: GitHub Actions exports every
    /// declared input, even the ones the workflow left blank.
    fn env_overrides(&self) -> ConfigResult<Dict> {
        let mut dict = Dict::new();

        for &name in ENV_FLAGS {
            if let Some(raw) = self.env_value(name) {
                let flag = parse_flag(&raw).ok_or_else(|| ConfigError::MalformedVar {
                    name,
                    pattern: "^(true|false|yes|no|1|0)$".into(),
                    value: raw.clone(),
                })?;
                dict.insert(name.to_ascii_lowercase(), Value::from(flag));
            }
        }

        for &name in ENV_STRINGS {
            if let Some(raw) = self.env_value(name) {
                dict.insert(name.to_ascii_lowercase(), Value::from(raw));
            }
        }

        Ok(dict)
    }

    /// Look up a setting, preferring the `INPUT_`-prefixed variable.
    fn env_value(&self, name: &str) -> Option<String> {
        [format!("{ACTION_INPUT_PREFIX}{name}"), name.to_string()]
            .iter()
            .filter_map(|key| self.env.get(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            // Check for boundary marker
            if let Some(ref marker) = self.boundary_marker {
                let marker_path = dir.join(marker);
                if marker_path.exists() && dir != start {
                    // Found boundary in a parent dir, stop searching
                    break;
                }
            }

            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
        let config_dir = proj_dirs.config_dir();

        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Utf8PathBuf::from_path_buf(config_path).ok();
            }
        }

        None
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Parse a boolean the way CI systems spell them.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

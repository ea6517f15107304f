//! Release asset resolution.
//!
//! Asset patterns come in two flavours. A pattern containing glob
//! metacharacters (`*`, `?`, `[`) is optional: matching nothing is fine.
//! Anything else is a literal path the user explicitly asked for, and it
//! must exist as a regular file.
//!
//! Resolved files are keyed by their final file name, since that is the
//! name the asset gets on the release. When two patterns produce the same
//! name the later one wins.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from asset resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// A literal asset path does not exist.
    #[error("asset not found: {path}")]
    Missing {
        /// The path as it was given.
        path: Utf8PathBuf,
    },

    /// A literal asset path exists but is not a regular file.
    #[error("asset is not a regular file: {path}")]
    NotAFile {
        /// The path as it was given.
        path: Utf8PathBuf,
    },

    /// `gh release upload` reads everything after a `#` as the asset label.
    #[error("asset path contains '#', which gh treats as a label separator: {path}")]
    HashInPath {
        /// The resolved path.
        path: Utf8PathBuf,
    },

    /// A glob pattern could not be compiled.
    #[error("invalid asset pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },
}

/// Result alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Upload progress of a single asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Not attempted yet.
    #[default]
    Pending,
    /// Uploaded successfully.
    Uploaded,
    /// The upload failed.
    Failed,
}

/// A local file destined for a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Where the file lives locally.
    pub path: Utf8PathBuf,
    /// The name the file gets on the release.
    pub name: String,
    /// File size at resolution time.
    pub size_bytes: u64,
    /// Upload progress; only the publisher changes this.
    pub upload_state: UploadState,
}

impl Asset {
    /// Create a pending asset named after the path's final component.
    pub fn new(path: impl Into<Utf8PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        Self {
            path,
            name,
            size_bytes,
            upload_state: UploadState::Pending,
        }
    }
}

/// Filesystem view used to resolve asset patterns.
pub trait AssetSource {
    /// Every path matching a glob pattern, files and directories alike.
    fn glob(&self, pattern: &str) -> AssetResult<Vec<Utf8PathBuf>>;

    /// The size of `path` if it is a regular file.
    fn file_size(&self, path: &Utf8Path) -> Option<u64>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Utf8Path) -> bool;

    /// Map a user-supplied pattern or path onto the source.
    fn locate(&self, path: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(path)
    }
}

/// The local filesystem, with relative patterns resolved against `root`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: Utf8PathBuf,
}

impl LocalFs {
    /// Resolve relative patterns against `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for LocalFs {
    fn glob(&self, pattern: &str) -> AssetResult<Vec<Utf8PathBuf>> {
        let full = self.locate(pattern);
        let paths = glob::glob(full.as_str()).map_err(|e| AssetError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut matched = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) => match Utf8PathBuf::from_path_buf(path) {
                    Ok(path) => matched.push(path),
                    Err(path) => warn!(path = %path.display(), "skipping non UTF-8 path"),
                },
                Err(e) => warn!(error = %e, "unreadable glob entry"),
            }
        }
        Ok(matched)
    }

    fn file_size(&self, path: &Utf8Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(std::fs::Metadata::is_file)
            .map(|m| m.len())
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.exists()
    }

    fn locate(&self, path: &str) -> Utf8PathBuf {
        self.root.join(path)
    }
}

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// A resolved, name-deduplicated list of assets in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssetSet {
    assets: Vec<Asset>,
}

impl AssetSet {
    /// Resolve `patterns` against `source`.
    ///
    /// # Errors
    ///
    /// Fails on the first literal path that is missing or not a file, on a
    /// path containing `#`, or on a malformed glob. Nothing is uploaded before this succeeds.
    #[instrument(skip(patterns, source), fields(patterns = patterns.len()))]
    pub fn resolve<S: AsRef<str>>(
        patterns: &[S],
        source: &impl AssetSource,
    ) -> AssetResult<Self> {
        let mut set = Self::default();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }

            if is_glob(pattern) {
                let matches = source.glob(pattern)?;
                let before = set.assets.len();
                for path in matches {
                    match source.file_size(&path) {
                        Some(size) => set.insert(Asset::new(path, size))?,
                        None => debug!(%path, "glob matched a non-file; skipping"),
                    }
                }
                if set.assets.len() == before {
                    debug!(pattern, "glob matched no files");
                }
                continue;
            }

            let path = source.locate(pattern);
            match source.file_size(&path) {
                Some(size) => set.insert(Asset::new(path, size))?,
                None if source.exists(&path) => {
                    return Err(AssetError::NotAFile {
                        path: pattern.into(),
                    });
                }
                None => {
                    return Err(AssetError::Missing {
                        path: pattern.into(),
                    });
                }
            }
        }

        debug!(count = set.len(), "assets resolved");
        Ok(set)
    }

    fn insert(&mut self, asset: Asset) -> AssetResult<()> {
        if asset.path.as_str().contains('#') {
            return Err(AssetError::HashInPath { path: asset.path });
        }
        if let Some(pos) = self.assets.iter().position(|a| a.name == asset.name) {
            let dropped = self.assets.remove(pos);
            if dropped.path == asset.path {
                debug!(path = %asset.path, "asset matched by several patterns");
            } else {
                warn!(
                    name = %asset.name,
                    dropped = %dropped.path,
                    kept = %asset.path,
                    "duplicate asset name; the later path wins"
                );
            }
        }
        self.assets.push(asset);
        Ok(())
    }

    /// The assets in upload order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Total size of every asset.
    pub fn total_bytes(&self) -> u64 {
        self.assets.iter().map(|a| a.size_bytes).sum()
    }

    /// Consume the set, yielding the assets in order.
    pub fn into_vec(self) -> Vec<Asset> {
        self.assets
    }
}

impl IntoIterator for AssetSet {
    type Item = Asset;
    type IntoIter = std::vec::IntoIter<Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.into_iter()
    }
}

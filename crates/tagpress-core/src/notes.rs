//! Release notes from the project changelog.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::changelog::{self, ParseError, matcher};

/// Errors from reading release notes.
#[derive(Error, Debug)]
pub enum NotesError {
    /// The changelog could not be read.
    #[error("failed to read changelog {path}: {source}")]
    Read {
        /// Where the changelog was expected.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The changelog has no version headings.
    #[error("{path}: {source}")]
    Parse {
        /// The changelog that failed to parse.
        path: Utf8PathBuf,
        /// What went wrong.
        #[source]
        source: ParseError,
    },
}

/// Result alias for notes operations.
pub type NotesResult<T> = Result<T, NotesError>;

/// Somewhere changelog text can be read from.
pub trait ChangelogSource {
    /// A human-readable location, used in error messages.
    fn location(&self) -> &Utf8Path;

    /// The raw changelog text.
    fn read_changelog(&self) -> NotesResult<String>;
}

/// A changelog file on disk.
#[derive(Debug, Clone)]
pub struct FileChangelog {
    path: Utf8PathBuf,
}

impl FileChangelog {
    /// Read the changelog at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChangelogSource for FileChangelog {
    fn location(&self) -> &Utf8Path {
        &self.path
    }

    fn read_changelog(&self) -> NotesResult<String> {
        std::fs::read_to_string(&self.path).map_err(|source| NotesError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

/// Read and parse the changelog, returning the body for `version`.
///
/// A version without a matching section yields an empty string; whether
/// that is acceptable is up to the caller.
#[instrument(skip(source), fields(changelog = %source.location()))]
pub fn extract(
    source: &impl ChangelogSource,
    version: &str,
    allow_prefix: bool,
) -> NotesResult<String> {
    let raw = source.read_changelog()?;
    let doc = changelog::parse(&raw).map_err(|source_err| NotesError::Parse {
        path: source.location().to_path_buf(),
        source: source_err,
    })?;
    let body = matcher::find(&doc, version, allow_prefix).to_string();
    debug!(bytes = body.len(), "release notes extracted");
    Ok(body)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Changelog text held in memory.
    #[derive(Debug)]
    pub(crate) struct StaticChangelog {
        pub(crate) text: Option<String>,
        path: Utf8PathBuf,
        reads: std::cell::Cell<usize>,
    }

    impl StaticChangelog {
        pub(crate) fn new(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                path: "CHANGELOG.md".into(),
                reads: std::cell::Cell::new(0),
            }
        }

        /// A changelog that fails to read like a missing file.
        pub(crate) fn missing() -> Self {
            Self {
                text: None,
                ..Self::new("")
            }
        }

        pub(crate) fn reads(&self) -> usize {
            self.reads.get()
        }
    }

    impl ChangelogSource for StaticChangelog {
        fn location(&self) -> &Utf8Path {
            &self.path
        }

        fn read_changelog(&self) -> NotesResult<String> {
            self.reads.set(self.reads.get() + 1);
            self.text.clone().ok_or_else(|| NotesError::Read {
                path: self.path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }
}

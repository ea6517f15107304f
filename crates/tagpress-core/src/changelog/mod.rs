//! Changelog parsing and per-version lookup.
//!
//! A changelog is loosely structured markdown: one heading per version,
//! free-form prose underneath. [`parse`] turns the raw text into an ordered
//! [`ChangelogDocument`]; [`matcher::find`] extracts the body for a single
//! version.
//!
//! ```
//! use tagpress_core::changelog::{self, matcher};
//!
//! let doc = changelog::parse("## [1.0.0]\nFoo\n## [0.9.0]\nBar").unwrap();
//! assert_eq!(matcher::find(&doc, "1.0.0", false), "Foo");
//! ```

pub mod matcher;
mod parser;

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub use parser::parse;

/// Errors from changelog parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No heading in the document carries a version number.
    #[error("changelog contains no recognizable version heading")]
    NoVersionHeading,
}

/// What a section heading refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// A released version with a parsable version number.
    Release,
    /// The leading section for changes that have not been released yet.
    Unreleased,
}

/// One version's worth of changelog content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSection {
    /// The version token (`1.2.3`), or the literal heading text for
    /// [`SectionKind::Unreleased`].
    pub version: String,
    /// Release date found in the heading, if any.
    pub release_date: Option<String>,
    /// Section prose with surrounding blank lines removed.
    pub body: String,
    /// Whether this section names a release.
    pub kind: SectionKind,
}

impl VersionSection {
    /// Whether this section takes part in version lookups.
    pub fn is_release(&self) -> bool {
        self.kind == SectionKind::Release
    }
}

/// A parsed changelog.
///
/// Sections keep document order. At most one unreleased section exists and
/// it is always first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangelogDocument {
    sections: Vec<VersionSection>,
}

impl ChangelogDocument {
    pub(crate) const fn new(sections: Vec<VersionSection>) -> Self {
        Self { sections }
    }

    /// All sections in document order.
    pub fn sections(&self) -> &[VersionSection] {
        &self.sections
    }

    /// Released sections only, in document order.
    pub fn releases(&self) -> impl Iterator<Item = &VersionSection> {
        self.sections.iter().filter(|s| s.is_release())
    }

    /// The unreleased section, if the changelog has one.
    pub fn unreleased(&self) -> Option<&VersionSection> {
        self.sections.first().filter(|s| !s.is_release())
    }

    /// Number of sections, including an unreleased one.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the document has no sections at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl FromStr for ChangelogDocument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

//! Version lookup within a parsed changelog.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{ChangelogDocument, VersionSection};

/// Everything from the first `X.Y.Z` triplet onward.
static FROM_TRIPLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?([0-9]+\.[0-9]+\.[0-9]+.*)$").unwrap());

/// Return the body of the section matching `version`, or `""` when nothing
/// matches.
///
/// Only release sections take part; the unreleased section is never
/// returned. With `allow_prefix` the query may carry any tag prefix
/// (`release-1.2.3`), and a section whose version extends the query
/// (`1.2.3-rc.1` for `1.2.3`) matches when no exact section exists.
///
/// ```
/// use tagpress_core::changelog::{self, matcher};
///
/// let doc = changelog::parse("## 1.2.0\nNew\n## 1.1.0\nOld").unwrap();
/// assert_eq!(matcher::find(&doc, "1.1.0", false), "Old");
/// assert_eq!(matcher::find(&doc, "v1.1.0", false), "");
/// assert_eq!(matcher::find(&doc, "v1.1.0", true), "Old");
/// ```
pub fn find<'a>(doc: &'a ChangelogDocument, version: &str, allow_prefix: bool) -> &'a str {
    find_section(doc, version, allow_prefix).map_or("", |s| s.body.as_str())
}

/// Like [`find`], but returns the whole matching section.
pub fn find_section<'a>(
    doc: &'a ChangelogDocument,
    version: &str,
    allow_prefix: bool,
) -> Option<&'a VersionSection> {
    let query = version.trim();
    if query.is_empty() {
        return None;
    }
    let query = if allow_prefix {
        strip_prefix(query)
    } else {
        query
    };

    if let Some(section) = doc.releases().find(|s| s.version == query) {
        debug!(version = query, "exact changelog match");
        return Some(section);
    }

    if allow_prefix {
        let section = doc.releases().find(|s| extends(&s.version, query));
        if let Some(section) = section {
            debug!(query, matched = %section.version, "prefix changelog match");
        }
        return section;
    }

    debug!(version = query, "no changelog section for version");
    None
}

/// Drop anything before the first version triplet.
fn strip_prefix(query: &str) -> &str {
    FROM_TRIPLET
        .captures(query)
        .and_then(|c| c.get(1))
        .map_or(query, |m| m.as_str())
}

/// Whether `candidate` starts with `query` at a component boundary, so
/// `1.2.3` extends `1.2` but `1.2.30` does not extend `1.2.3`.
fn extends(candidate: &str, query: &str) -> bool {
    candidate
        .strip_prefix(query)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()))
}

//! Line-oriented changelog parser.
//!
//! The heading level of the first versioned heading becomes the section
//! level. Headings at that level start sections, deeper headings are body
//! text, and shallower ones (a `# Changelog` title, for instance) close the
//! open section. Text inside fenced code blocks is never treated as a
//! heading.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use super::{ChangelogDocument, ParseError, SectionKind, VersionSection};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").unwrap());

/// The version must lead the heading, optionally after "Release" or "Version".
static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?i:release|version)\s+)?[\[(]?v?([0-9]+\.[0-9]+\.[0-9]+(?:[-+][0-9A-Za-z.+-]*)?)",
    )
    .unwrap()
});

static RELEASE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{4}-[0-9]{2}-[0-9]{2})\b").unwrap());

/// `[1.0.0]: https://...` compare links in a keep-a-changelog footer.
static VERSION_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^ {0,3}\[(?:unreleased|v?[0-9]+\.[0-9]+\.[0-9]+[^\]]*)\]:\s*\S+").unwrap()
});

/// Parse raw changelog text.
///
/// # Errors
///
/// Returns [`ParseError::NoVersionHeading`] when no heading carries a
/// version number.
#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn parse(raw: &str) -> Result<ChangelogDocument, ParseError> {
    let level = classify(raw)
        .find_map(|line| match line {
            Line::Heading { level, text, .. } => version_token(text).map(|_| level),
            Line::Text(_) => None,
        })
        .ok_or(ParseError::NoVersionHeading)?;
    debug!(level, "section heading level");

    let mut builder = Builder::new(level);
    for line in classify(raw) {
        builder.push(line);
    }
    let doc = builder.finish();
    debug!(sections = doc.len(), "changelog parsed");
    Ok(doc)
}

#[derive(Debug, Clone, Copy)]
enum Line<'a> {
    Heading {
        raw: &'a str,
        level: usize,
        text: &'a str,
    },
    Text(&'a str),
}

/// Tag each line as heading or text, skipping fenced code blocks.
fn classify(raw: &str) -> impl Iterator<Item = Line<'_>> {
    let mut in_fence = false;
    raw.lines().map(move |line| {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            return Line::Text(line);
        }
        if in_fence {
            return Line::Text(line);
        }
        match HEADING.captures(line) {
            Some(caps) => {
                let level = caps.get(1).map_or(0, |m| m.as_str().len());
                let text = caps.get(2).map_or("", |m| m.as_str());
                Line::Heading {
                    raw: line,
                    level,
                    text,
                }
            }
            None => Line::Text(line),
        }
    })
}

/// Extract the version token and an optional date from heading text.
fn version_token(text: &str) -> Option<(String, Option<String>)> {
    let caps = VERSION_TOKEN.captures(text)?;
    let token = caps.get(1)?;
    let date = RELEASE_DATE
        .captures(&text[token.end()..])
        .map(|c| c[1].to_string());
    Some((token.as_str().to_string(), date))
}

struct OpenSection<'a> {
    version: String,
    release_date: Option<String>,
    kind: SectionKind,
    lines: Vec<&'a str>,
}

enum State<'a> {
    /// Outside any section (document preamble, or after a title heading).
    Outside,
    /// Collecting lines for a section.
    Collecting(OpenSection<'a>),
    /// Skipping a duplicate version's content.
    Discarding,
}

struct Builder<'a> {
    level: usize,
    sections: Vec<VersionSection>,
    seen: HashSet<String>,
    state: State<'a>,
}

impl<'a> Builder<'a> {
    fn new(level: usize) -> Self {
        Self {
            level,
            sections: Vec::new(),
            seen: HashSet::new(),
            state: State::Outside,
        }
    }

    fn push(&mut self, line: Line<'a>) {
        match line {
            Line::Heading { level, text, .. } if level == self.level => {
                self.section_heading(line, text);
            }
            Line::Heading { level, .. } if level < self.level => {
                self.close();
                self.state = State::Outside;
            }
            Line::Heading { raw, .. } | Line::Text(raw) => self.body_line(raw),
        }
    }

    fn section_heading(&mut self, line: Line<'a>, text: &str) {
        if let Some((version, release_date)) = version_token(text) {
            self.close();
            if self.seen.insert(version.clone()) {
                self.state = State::Collecting(OpenSection {
                    version,
                    release_date,
                    kind: SectionKind::Release,
                    lines: Vec::new(),
                });
            } else {
                warn!(%version, "duplicate changelog heading ignored; first occurrence wins");
                self.state = State::Discarding;
            }
            return;
        }

        let starts_unreleased =
            matches!(self.state, State::Outside) && self.sections.is_empty();
        if starts_unreleased {
            self.state = State::Collecting(OpenSection {
                version: text.to_string(),
                release_date: None,
                kind: SectionKind::Unreleased,
                lines: Vec::new(),
            });
        } else if let Line::Heading { raw, .. } = line {
            self.body_line(raw);
        }
    }

    fn body_line(&mut self, raw: &'a str) {
        if let State::Collecting(ref mut open) = self.state {
            open.lines.push(raw);
        }
    }

    fn close(&mut self) {
        if let State::Collecting(open) = std::mem::replace(&mut self.state, State::Outside) {
            self.sections.push(VersionSection {
                version: open.version,
                release_date: open.release_date,
                body: trim_body(&open.lines),
                kind: open.kind,
            });
        }
    }

    fn finish(mut self) -> ChangelogDocument {
        self.close();
        ChangelogDocument::new(self.sections)
    }
}

/// Drop surrounding blank lines and trailing version link definitions.
fn trim_body(lines: &[&str]) -> String {
    let mut end = lines.len();
    loop {
        while end > 0 && lines[end - 1].trim().is_empty() {
            end -= 1;
        }
        if end > 0 && VERSION_LINK.is_match(lines[end - 1]) {
            end -= 1;
            continue;
        }
        break;
    }
    let start = lines[..end]
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(end);
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEEP_A_CHANGELOG: &str = "\
# Changelog

All notable changes to this project will be documented in this file.

## [Unreleased]

- Work in progress

## [1.1.0] - 2024-03-02

### Added

- New `--draft` flag

### Fixed

- Crash on empty tag

## [1.0.0] - 2024-01-15

Initial release.

[Unreleased]: https://example.com/compare/v1.1.0...HEAD
[1.1.0]: https://example.com/compare/v1.0.0...v1.1.0
[1.0.0]: https://example.com/releases/tag/v1.0.0
";

    #[test]
    fn parses_sections_in_document_order() {
        let doc = parse(KEEP_A_CHANGELOG).unwrap();
        let versions: Vec<&str> = doc.sections().iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, ["[Unreleased]", "1.1.0", "1.0.0"]);
        assert_eq!(doc.releases().count(), 2);
    }

    #[test]
    fn unreleased_section_is_first_and_excluded_from_releases() {
        let doc = parse(KEEP_A_CHANGELOG).unwrap();
        let unreleased = doc.unreleased().unwrap();
        assert_eq!(unreleased.kind, SectionKind::Unreleased);
        assert_eq!(unreleased.body, "- Work in progress");
        assert!(doc.releases().all(|s| s.version != "[Unreleased]"));
    }

    #[test]
    fn subsection_headings_stay_in_body() {
        let doc = parse(KEEP_A_CHANGELOG).unwrap();
        let section = &doc.sections()[1];
        assert_eq!(
            section.body,
            "### Added\n\n- New `--draft` flag\n\n### Fixed\n\n- Crash on empty tag"
        );
    }

    #[test]
    fn release_date_is_captured_but_not_part_of_version() {
        let doc = parse(KEEP_A_CHANGELOG).unwrap();
        let section = &doc.sections()[1];
        assert_eq!(section.version, "1.1.0");
        assert_eq!(section.release_date.as_deref(), Some("2024-03-02"));
    }

    #[test]
    fn footer_link_references_are_stripped() {
        let doc = parse(KEEP_A_CHANGELOG).unwrap();
        let last = doc.sections().last().unwrap();
        assert_eq!(last.body, "Initial release.");
    }

    #[test]
    fn section_keeps_its_own_link_definitions() {
        let raw = "\
## 1.1.0
See [the guide][guide].

[guide]: https://example.com/guide

## 1.0.0
old
";
        let doc = parse(raw).unwrap();
        assert_eq!(
            doc.sections()[0].body,
            "See [the guide][guide].\n\n[guide]: https://example.com/guide"
        );
        assert_eq!(doc.sections()[1].body, "old");
    }

    #[test]
    fn bodies_have_no_surrounding_blank_lines() {
        let raw = "## 2.0.0\n\n\n  \nBody line\n\nSecond\n\n\n## 1.0.0\n\n\n";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.sections()[0].body, "Body line\n\nSecond");
        assert_eq!(doc.sections()[1].body, "");
    }

    #[test]
    fn heading_styles() {
        let raw = "\
## v3.0.0 (2024-05-01)
three
## [2.0.0](https://example.com/compare/v1.0.0...v2.0.0) (2024-04-01)
two
## Release 1.0.0-beta.2
one
";
        let doc = parse(raw).unwrap();
        let versions: Vec<&str> = doc.sections().iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, ["3.0.0", "2.0.0", "1.0.0-beta.2"]);
        assert_eq!(doc.sections()[0].release_date.as_deref(), Some("2024-05-01"));
        assert_eq!(doc.sections()[1].release_date.as_deref(), Some("2024-04-01"));
        assert_eq!(doc.sections()[2].release_date, None);
    }

    #[test]
    fn duplicate_version_keeps_first_occurrence() {
        let raw = "## [1.0.0]\noriginal\n## [1.0.0]\nappended by mistake\n## [0.9.0]\nolder";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.sections()[0].body, "original");
        assert_eq!(doc.sections()[1].version, "0.9.0");
        assert_eq!(doc.sections()[1].body, "older");
    }

    #[test]
    fn headings_inside_code_fences_are_ignored() {
        let raw = "## 1.1.0\n```md\n## 9.9.9\n```\ndone\n## 1.0.0\nx";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.sections()[0].body, "```md\n## 9.9.9\n```\ndone");
    }

    #[test]
    fn non_version_heading_after_releases_is_body_text() {
        let raw = "## 1.0.0\nfirst\n## Notes\nextra";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.unreleased().is_none());
        assert_eq!(doc.sections()[0].body, "first\n## Notes\nextra");
    }

    #[test]
    fn shallower_heading_closes_section() {
        let raw = "## 1.0.0\nfirst\n# Appendix\nnot part of any release";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.sections()[0].body, "first");
    }

    #[test]
    fn crlf_line_endings() {
        let raw = "## 1.0.0\r\nFoo\r\n\r\n## 0.9.0\r\nBar\r\n";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.sections()[0].body, "Foo");
        assert_eq!(doc.sections()[1].body, "Bar");
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse(KEEP_A_CHANGELOG), parse(KEEP_A_CHANGELOG));
    }

    #[test]
    fn no_version_heading_is_an_error() {
        assert_eq!(
            parse("# Changelog\n\n## Unreleased\n- stuff"),
            Err(ParseError::NoVersionHeading)
        );
        assert_eq!(parse(""), Err(ParseError::NoVersionHeading));
    }

    #[test]
    fn unreleased_heading_mentioning_a_version_stays_unreleased() {
        let raw = "## Unreleased (since 1.0.0)\nwip\n## 1.0.0\nreal\n";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 2);
        let unreleased = doc.unreleased().unwrap();
        assert_eq!(unreleased.version, "Unreleased (since 1.0.0)");
        assert_eq!(unreleased.body, "wip");
        assert_eq!(doc.sections()[1].version, "1.0.0");
        assert_eq!(doc.sections()[1].body, "real");
    }

    #[test]
    fn version_must_lead_the_heading() {
        let raw = "## 2.0.0\nnew\n## Notes for 1.0.0 users\nmigrate\n";
        let doc = parse(raw).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.sections()[0].body, "new\n## Notes for 1.0.0 users\nmigrate");
    }

    #[test]
    fn version_in_prose_is_not_a_heading() {
        let err = parse("We shipped 1.0.0 last week.\n").unwrap_err();
        assert_eq!(err, ParseError::NoVersionHeading);
    }

    #[test]
    fn from_str_delegates_to_parse() {
        let doc: ChangelogDocument = "## 0.1.0\nhello".parse().unwrap();
        assert_eq!(doc.sections()[0].body, "hello");
    }
}

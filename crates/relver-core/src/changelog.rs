//! Merging fresh release notes into an existing changelog.
//!
//! Two strategies recognize where a release section starts, in priority
//! order:
//!
//! 1. a legacy inline anchor, `<a name="1.2.3"></a>`;
//! 2. a Markdown heading carrying a version, `## 1.2.3` or `## [1.2.3](...)`.
//!
//! The previous release boundary is the earliest section either one finds;
//! priority only settles sections starting at the same offset. Everything
//! from the boundary on is kept verbatim and everything before it (the old
//! header) is replaced. When neither matches the whole document is kept.

use std::fs;
use std::io;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::update::write_atomic;
use crate::version::SemanticVersion;

/// Errors from changelog operations.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The configured header would be mistaken for a release section.
    #[error("changelog header must not contain a versioned heading or <a name=...> anchor")]
    InvalidHeader,

    /// The changelog exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Changelog path.
        path: Utf8PathBuf,
        /// The I/O error.
        source: io::Error,
    },

    /// The merged changelog could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Changelog path.
        path: Utf8PathBuf,
        /// The I/O error.
        source: io::Error,
    },
}

/// Result alias for changelog operations.
pub type ChangelogResult<T> = Result<T, ChangelogError>;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a name=["']?([^"'>\s]*)["']?\s*>"#).expect("anchor regex")
});

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#+ \[?v?([0-9]+\.[0-9]+\.[0-9]+[^\s\]\)]*)").expect("heading regex")
});

/// A way of recognizing where a release section starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Boundary {
    Anchor,
    Heading,
}

impl Boundary {
    const PRIORITY: [Self; 2] = [Self::Anchor, Self::Heading];

    fn regex(self) -> &'static Regex {
        match self {
            Self::Anchor => &ANCHOR,
            Self::Heading => &HEADING,
        }
    }

    /// Start offset and version text of every section this strategy sees.
    fn sections(self, text: &str) -> Vec<(usize, &str)> {
        let regex = self.regex();
        let mut sections: Vec<(usize, &str)> = regex
            .captures_iter(text)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str())))
            .collect();
        if self == Self::Heading {
            // Headings start a line; report the line start.
            for (start, _) in &mut sections {
                *start = text[..*start].rfind('\n').map_or(0, |nl| nl + 1);
            }
        }
        sections
    }
}

fn same_version(found: &str, version: &str) -> bool {
    match (SemanticVersion::parse(found), SemanticVersion::parse(version)) {
        (Ok(a), Ok(b)) => a == b,
        _ => found == version,
    }
}

/// Every release section in document order. An anchor directly followed by
/// its own heading counts once.
fn sections(text: &str) -> Vec<(usize, Boundary, &str)> {
    let mut all: Vec<(usize, Boundary, &str)> = Boundary::PRIORITY
        .into_iter()
        .flat_map(|strategy| {
            strategy
                .sections(text)
                .into_iter()
                .map(move |(start, found)| (start, strategy, found))
        })
        .collect();
    all.sort_by_key(|&(start, strategy, _)| (start, strategy));
    all.dedup_by(|later, earlier| same_version(later.2, earlier.2));
    all
}

/// Offset in `existing` where retained content begins.
fn boundary(existing: &str, version: &str) -> usize {
    let sections = sections(existing);
    let Some(&(first, strategy, found)) = sections.first() else {
        return 0;
    };
    debug!(?strategy, found, "previous release boundary");
    if same_version(found, version) {
        // Re-running the same release replaces its section.
        return sections
            .get(1)
            .map_or(existing.len(), |&(next, _, _)| next);
    }
    first
}

/// Merge release notes under a header, keeping prior releases.
///
/// `version` is the release the notes describe; if the newest section of
/// `existing` is already that release it is replaced instead of duplicated.
/// The result ends with exactly one newline.
pub fn merge(existing: Option<&str>, header: &str, notes: &str, version: &str) -> String {
    let tail = existing.map_or("", |text| &text[boundary(text, version)..]);
    let merged = format!("{header}\n{notes}{tail}");
    let body = merged.trim_end_matches('\n');
    format!("{body}\n")
}

/// Reject headers that would be read back as a release section.
pub fn validate_header(header: &str) -> ChangelogResult<()> {
    if ANCHOR.is_match(header) || HEADING.is_match(header) {
        return Err(ChangelogError::InvalidHeader);
    }
    Ok(())
}

/// Validate, read, merge and (unless `dry_run`) write the changelog.
///
/// Returns the merged text. A missing file is created.
#[instrument(skip_all, fields(%path, %version, dry_run))]
pub fn update_changelog(
    path: &Utf8Path,
    header: &str,
    notes: &str,
    version: &SemanticVersion,
    dry_run: bool,
) -> ChangelogResult<String> {
    validate_header(header)?;

    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("creating new changelog");
            None
        }
        Err(source) => {
            return Err(ChangelogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let merged = merge(existing.as_deref(), header, notes, &version.to_string());
    if !dry_run {
        write_atomic(path, &merged).map_err(|source| ChangelogError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(bytes = merged.len(), "changelog updated");
    }
    Ok(merged)
}

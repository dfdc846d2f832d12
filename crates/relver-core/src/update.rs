//! Reading the current version and rewriting every file that records it.
//!
//! The flow is: pick the package file (the authoritative version), build the
//! bump set (configured files, then built-in defaults, minus ignored and
//! missing ones), then rewrite each file through its [`FileKind`] adapter.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::files::{FileDescriptor, FileEntry, FileKind, FormatError, KeyPath};
use crate::git::{GitError, TagLister, highest_version_tag};
use crate::version::{SemanticVersion, VersionError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from locating or rewriting version files.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// No package file carries a version and tag fallback is off or found
    /// nothing.
    #[error("no package file with a version found in {root}")]
    NoPackageFile {
        /// Project root that was searched.
        root: Utf8PathBuf,
    },

    /// A version file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// The I/O error.
        source: io::Error,
    },

    /// A version file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: Utf8PathBuf,
        /// The I/O error.
        source: io::Error,
    },

    /// A file's contents or configured type is unusable.
    #[error("{path}: {source}")]
    Format {
        /// File path.
        path: Utf8PathBuf,
        /// The adapter error.
        source: FormatError,
    },

    /// The package file holds something that is not a version.
    #[error("{path} holds an invalid version: {source}")]
    Version {
        /// File path.
        path: Utf8PathBuf,
        /// The parse error.
        source: VersionError,
    },

    /// An ignore rule is not a valid glob.
    #[error("invalid ignore rule `{rule}` in {path}: {source}")]
    Ignore {
        /// The ignore file.
        path: Utf8PathBuf,
        /// The offending rule.
        rule: String,
        /// The glob error.
        source: globset::Error,
    },

    /// Listing tags for the fallback failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result alias for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

// ──────────────────────────────────────────────
// Defaults
// ──────────────────────────────────────────────

/// Package files tried when none are configured.
pub const DEFAULT_PACKAGE_FILES: &[&str] = &["package.json", "bower.json", "manifest.json"];

/// Files rewritten on every bump in addition to configured ones.
pub const DEFAULT_BUMP_FILES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "npm-shrinkwrap.json",
    "bower.json",
    "manifest.json",
];

/// Version assumed when tag fallback finds no version tags at all.
pub const INITIAL_VERSION: SemanticVersion = SemanticVersion::new(1, 0, 0);

fn json_defaults(names: &[&str]) -> Vec<FileDescriptor> {
    names
        .iter()
        .map(|name| {
            FileDescriptor::new(
                *name,
                FileKind::Json {
                    key: KeyPath::default(),
                },
            )
        })
        .collect()
}

/// The built-in bump files as descriptors.
pub fn default_bump_files() -> Vec<FileDescriptor> {
    json_defaults(DEFAULT_BUMP_FILES)
}

fn resolve_entries(entries: &[FileEntry]) -> UpdateResult<Vec<FileDescriptor>> {
    entries
        .iter()
        .map(|entry| {
            FileDescriptor::from_entry(entry).map_err(|source| UpdateError::Format {
                path: entry.path().to_path_buf(),
                source,
            })
        })
        .collect()
}

/// Package-file candidates from config, or the built-in list.
pub fn package_candidates(config: &Config) -> UpdateResult<Vec<FileDescriptor>> {
    if config.files.package.is_empty() {
        Ok(json_defaults(DEFAULT_PACKAGE_FILES))
    } else {
        resolve_entries(&config.files.package)
    }
}

/// Configured bump files, in configuration order.
pub fn configured_bump_files(config: &Config) -> UpdateResult<Vec<FileDescriptor>> {
    resolve_entries(&config.files.bump)
}

// ──────────────────────────────────────────────
// Current version
// ──────────────────────────────────────────────

/// The file the current version was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Which file and how it stores the version.
    pub descriptor: FileDescriptor,
    /// The version it holds.
    pub version: SemanticVersion,
}

/// Where the current version came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VersionSource {
    /// Read from a package file.
    PackageFile {
        /// Path relative to the project root.
        path: Utf8PathBuf,
    },
    /// The highest version tag.
    Tag {
        /// Tag name.
        name: String,
    },
    /// No package file and no version tags.
    Initial,
}

/// The current version and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentVersion {
    /// The version.
    pub version: SemanticVersion,
    /// Where it came from.
    pub source: VersionSource,
}

fn read(root: &Utf8Path, path: &Utf8Path) -> UpdateResult<Option<String>> {
    let full = root.join(path);
    match fs::read_to_string(&full) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(UpdateError::Read { path: full, source }),
    }
}

/// The first candidate that exists and carries a version.
///
/// Files that exist but have no version field are skipped. A version field
/// that does not parse is an error.
#[instrument(skip_all, fields(%root, count = candidates.len()))]
pub fn discover_package_file(
    root: &Utf8Path,
    candidates: &[FileDescriptor],
) -> UpdateResult<Option<PackageFile>> {
    for descriptor in candidates {
        let Some(contents) = read(root, &descriptor.path)? else {
            continue;
        };
        let extracted = descriptor
            .kind
            .extract(&contents)
            .map_err(|source| UpdateError::Format {
                path: descriptor.path.clone(),
                source,
            })?;
        let Some(raw) = extracted else {
            debug!(path = %descriptor.path, "no version field");
            continue;
        };
        let version = SemanticVersion::parse(&raw).map_err(|source| UpdateError::Version {
            path: descriptor.path.clone(),
            source,
        })?;
        debug!(path = %descriptor.path, %version, "package file");
        return Ok(Some(PackageFile {
            descriptor: descriptor.clone(),
            version,
        }));
    }
    Ok(None)
}

/// Determine the version being released from.
///
/// Package files come first. With `files.tag_fallback` the highest tag
/// carrying `git.tag_prefix` is used next, and a repository without any
/// version tags starts from [`INITIAL_VERSION`].
#[instrument(skip_all, fields(%root))]
pub fn current_version(
    root: &Utf8Path,
    config: &Config,
    tags: &dyn TagLister,
) -> UpdateResult<CurrentVersion> {
    let candidates = package_candidates(config)?;
    if let Some(package) = discover_package_file(root, &candidates)? {
        return Ok(CurrentVersion {
            version: package.version,
            source: VersionSource::PackageFile {
                path: package.descriptor.path,
            },
        });
    }

    if !config.files.tag_fallback {
        return Err(UpdateError::NoPackageFile {
            root: root.to_path_buf(),
        });
    }

    let all = match tags.version_tags() {
        Ok(all) => all,
        Err(GitError::NotARepo) => {
            return Err(UpdateError::NoPackageFile {
                root: root.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let prefix = &config.git.tag_prefix;
    match highest_version_tag(&all, prefix) {
        Some(version) => {
            let name = format!("{prefix}{version}");
            info!(tag = %name, "no package file, using latest tag");
            Ok(CurrentVersion {
                version,
                source: VersionSource::Tag { name },
            })
        }
        None => {
            warn!(version = %INITIAL_VERSION, "no package file or version tags");
            Ok(CurrentVersion {
                version: INITIAL_VERSION,
                source: VersionSource::Initial,
            })
        }
    }
}

// ──────────────────────────────────────────────
// Ignore rules
// ──────────────────────────────────────────────

/// Glob rules naming files that must never be written.
///
/// Uses a subset of `.gitignore` syntax: blank lines and `#` comments are
/// skipped, a leading `/` anchors the rule at the project root, a rule
/// without `/` matches the name at any depth, and a trailing `/` or a
/// directory match covers everything below it. Negated (`!`) rules are not
/// supported and are skipped.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    set: GlobSet,
    rules: usize,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self {
            set: GlobSet::empty(),
            rules: 0,
        }
    }
}

impl IgnoreList {
    /// Read rules from `root/file`. A missing file means no rules.
    #[instrument(skip_all, fields(%root, %file))]
    pub fn load(root: &Utf8Path, file: &Utf8Path) -> UpdateResult<Self> {
        let path = root.join(file);
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no ignore file");
                Ok(Self::default())
            }
            Err(source) => Err(UpdateError::Read { path, source }),
        }
    }

    /// Compile rules from text. `origin` is used in error messages.
    pub fn parse(text: &str, origin: &Utf8Path) -> UpdateResult<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut rules = 0;

        for line in text.lines() {
            let rule = line.trim();
            if rule.is_empty() || rule.starts_with('#') {
                continue;
            }
            if rule.starts_with('!') {
                debug!(%rule, "negated ignore rules are not supported");
                continue;
            }

            let trimmed = rule.trim_end_matches('/');
            let base = match trimmed.strip_prefix('/') {
                Some(anchored) => anchored.to_string(),
                None if trimmed.contains('/') => trimmed.to_string(),
                None => format!("**/{trimmed}"),
            };

            for pattern in [base.clone(), format!("{base}/**")] {
                let glob = GlobBuilder::new(&pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|source| UpdateError::Ignore {
                        path: origin.to_path_buf(),
                        rule: rule.to_string(),
                        source,
                    })?;
                builder.add(glob);
            }
            rules += 1;
        }

        let set = builder.build().map_err(|source| UpdateError::Ignore {
            path: origin.to_path_buf(),
            rule: String::new(),
            source,
        })?;
        debug!(rules, "ignore rules compiled");
        Ok(Self { set, rules })
    }

    /// Whether a root-relative path is ignored.
    pub fn is_ignored(&self, path: &Utf8Path) -> bool {
        self.rules > 0 && self.set.is_match(path.as_std_path())
    }

    /// Number of active rules.
    pub const fn len(&self) -> usize {
        self.rules
    }

    /// Whether there are no active rules.
    pub const fn is_empty(&self) -> bool {
        self.rules == 0
    }
}

// ──────────────────────────────────────────────
// Bump set
// ──────────────────────────────────────────────

/// The files to rewrite, in order.
///
/// Configured descriptors come first, then `defaults`. The first descriptor
/// for a path wins. Ignored paths and files missing from disk are dropped.
#[instrument(skip_all, fields(%root))]
pub fn bump_set(
    root: &Utf8Path,
    configured: &[FileDescriptor],
    defaults: &[FileDescriptor],
    ignore: &IgnoreList,
) -> Vec<FileDescriptor> {
    let mut seen = HashSet::new();
    let set: Vec<FileDescriptor> = configured
        .iter()
        .chain(defaults)
        .filter(|d| seen.insert(d.path.clone()))
        .filter(|d| {
            let ignored = ignore.is_ignored(&d.path);
            if ignored {
                debug!(path = %d.path, "ignored");
            }
            !ignored
        })
        .filter(|d| root.join(&d.path).is_file())
        .cloned()
        .collect();
    debug!(count = set.len(), "bump set");
    set
}

/// Build the bump set described by `config`.
pub fn bump_set_for(root: &Utf8Path, config: &Config) -> UpdateResult<Vec<FileDescriptor>> {
    let configured = configured_bump_files(config)?;
    let ignore = IgnoreList::load(root, &config.files.ignore_file)?;
    Ok(bump_set(root, &configured, &default_bump_files(), &ignore))
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUpdate {
    /// Path relative to the project root.
    pub path: Utf8PathBuf,
    /// Version found before the rewrite, if any.
    pub previous: Option<String>,
    /// Version written.
    pub new: String,
    /// Whether the contents differ (and were written, outside dry runs).
    pub changed: bool,
}

/// Rewrite every file in `set` to carry `next`.
///
/// Unchanged files are not written. A dry run computes every update without
/// touching disk. The first read or write failure stops the run; files
/// already written stay written.
#[instrument(skip_all, fields(%root, %next, count = set.len()))]
pub fn apply_bump_set(
    root: &Utf8Path,
    set: &[FileDescriptor],
    next: &SemanticVersion,
    dry_run: bool,
) -> UpdateResult<Vec<FileUpdate>> {
    let new = next.to_string();
    let mut updates = Vec::with_capacity(set.len());

    for descriptor in set {
        let full = root.join(&descriptor.path);
        let contents = fs::read_to_string(&full).map_err(|source| UpdateError::Read {
            path: full.clone(),
            source,
        })?;
        let format_err = |source| UpdateError::Format {
            path: descriptor.path.clone(),
            source,
        };
        let previous = descriptor.kind.extract(&contents).map_err(format_err)?;
        let rewritten = descriptor.kind.apply(&contents, &new).map_err(format_err)?;
        let changed = rewritten != contents;

        if changed && !dry_run {
            write_atomic(&full, &rewritten).map_err(|source| UpdateError::Write {
                path: full.clone(),
                source,
            })?;
        }
        info!(path = %descriptor.path, kind = %descriptor.kind, ?previous, changed, dry_run, "bumped");

        updates.push(FileUpdate {
            path: descriptor.path.clone(),
            previous,
            new: new.clone(),
            changed,
        });
    }

    Ok(updates)
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, keeping the original permissions.
pub(crate) fn write_atomic(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{FileEntry, FileType, PatternFormat};
    use tempfile::TempDir;

    struct Tags(Vec<&'static str>);

    impl TagLister for Tags {
        fn version_tags(&self) -> crate::git::GitResult<Vec<String>> {
            Ok(self.0.iter().map(|t| (*t).to_string()).collect())
        }
    }

    struct NoRepo;

    impl TagLister for NoRepo {
        fn version_tags(&self) -> crate::git::GitResult<Vec<String>> {
            Err(GitError::NotARepo)
        }
    }

    fn scratch() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    fn write(root: &Utf8Path, path: &str, contents: &str) {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }

    fn json(path: &str) -> FileDescriptor {
        FileDescriptor::infer(path).unwrap()
    }

    #[test]
    fn discover_skips_missing_and_versionless_files() {
        let (_tmp, root) = scratch();
        write(&root, "bower.json", "{\"name\": \"x\"}\n");
        write(&root, "manifest.json", "{\"version\": \"3.1.0\"}\n");

        let found = discover_package_file(&root, &json_defaults(DEFAULT_PACKAGE_FILES))
            .unwrap()
            .unwrap();
        assert_eq!(found.descriptor.path, "manifest.json");
        assert_eq!(found.version.to_string(), "3.1.0");
    }

    #[test]
    fn discover_rejects_garbage_version() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{\"version\": \"one\"}");
        let err = discover_package_file(&root, &[json("package.json")]).unwrap_err();
        assert!(matches!(err, UpdateError::Version { .. }));
    }

    #[test]
    fn current_version_prefers_package_file() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{\"version\": \"1.4.0\"}");
        let current = current_version(&root, &Config::default(), &Tags(vec!["v9.0.0"])).unwrap();
        assert_eq!(current.version.to_string(), "1.4.0");
        assert_eq!(
            current.source,
            VersionSource::PackageFile {
                path: "package.json".into()
            }
        );
    }

    #[test]
    fn current_version_falls_back_to_tags() {
        let (_tmp, root) = scratch();
        let current =
            current_version(&root, &Config::default(), &Tags(vec!["v1.2.0", "v1.10.0", "junk"])).unwrap();
        assert_eq!(current.version.to_string(), "1.10.0");
        assert_eq!(current.source, VersionSource::Tag { name: "v1.10.0".into() });
    }

    #[test]
    fn current_version_without_tags_starts_at_initial() {
        let (_tmp, root) = scratch();
        let current = current_version(&root, &Config::default(), &Tags(vec![])).unwrap();
        assert_eq!(current.version, INITIAL_VERSION);
        assert_eq!(current.source, VersionSource::Initial);
    }

    #[test]
    fn current_version_without_fallback_errors() {
        let (_tmp, root) = scratch();
        let mut config = Config::default();
        config.files.tag_fallback = false;
        let err = current_version(&root, &config, &Tags(vec!["v1.0.0"])).unwrap_err();
        assert!(matches!(err, UpdateError::NoPackageFile { .. }));

        let err = current_version(&root, &Config::default(), &NoRepo).unwrap_err();
        assert!(matches!(err, UpdateError::NoPackageFile { .. }));
    }

    #[test]
    fn current_version_uses_configured_package_file() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{\"version\": \"1.0.0\"}");
        write(&root, "VERSION", "2.5.0\n");
        let mut config = Config::default();
        config.files.package = vec![FileEntry::Path("VERSION".into())];
        let current = current_version(&root, &config, &Tags(vec![])).unwrap();
        assert_eq!(current.version.to_string(), "2.5.0");
    }

    #[test]
    fn ignore_rules_follow_gitignore_shapes() {
        let text = "# comment\n\nnode_modules/\n/manifest.json\nsub/*.json\n!keep.json\n*.lock\n";
        let ignore = IgnoreList::parse(text, Utf8Path::new(".gitignore")).unwrap();
        assert_eq!(ignore.len(), 4);

        assert!(ignore.is_ignored(Utf8Path::new("node_modules/x/package.json")));
        assert!(ignore.is_ignored(Utf8Path::new("a/node_modules/package.json")));
        assert!(ignore.is_ignored(Utf8Path::new("manifest.json")));
        assert!(!ignore.is_ignored(Utf8Path::new("app/manifest.json")));
        assert!(ignore.is_ignored(Utf8Path::new("sub/bower.json")));
        assert!(!ignore.is_ignored(Utf8Path::new("sub/deeper/bower.json")));
        assert!(ignore.is_ignored(Utf8Path::new("deep/Cargo.lock")));
        assert!(!ignore.is_ignored(Utf8Path::new("package.json")));
    }

    #[test]
    fn missing_ignore_file_is_empty() {
        let (_tmp, root) = scratch();
        let ignore = IgnoreList::load(&root, Utf8Path::new(".gitignore")).unwrap();
        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(Utf8Path::new("package.json")));
    }

    #[test]
    fn bump_set_dedups_filters_and_keeps_order() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{}");
        write(&root, "manifest.json", "{}");
        write(&root, "VERSION", "1.0.0\n");
        write(&root, "package-lock.json", "{}");

        let configured = vec![
            FileDescriptor::new("VERSION", FileKind::PlainText),
            FileDescriptor::new(
                "package.json",
                FileKind::Json {
                    key: KeyPath::parse("meta.version"),
                },
            ),
        ];
        let ignore = IgnoreList::parse("/manifest.json\n", Utf8Path::new(".gitignore")).unwrap();
        let set = bump_set(&root, &configured, &default_bump_files(), &ignore);

        let paths: Vec<&str> = set.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["VERSION", "package.json", "package-lock.json"]);
        // The configured descriptor for package.json won over the default.
        assert_eq!(
            set[1].kind,
            FileKind::Json {
                key: KeyPath::parse("meta.version")
            }
        );
    }

    #[test]
    fn apply_rewrites_changed_files_only() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{\n  \"name\": \"x\",\n  \"version\": \"1.0.0\"\n}\n");
        write(&root, "VERSION", "1.1.0\n");
        write(&root, "Cargo.toml", "[package]\nname = \"x\"\n");

        let set = vec![
            json("package.json"),
            FileDescriptor::new("VERSION", FileKind::PlainText),
            FileDescriptor::new("Cargo.toml", FileKind::Pattern(PatternFormat::Cargo)),
        ];
        let next = SemanticVersion::parse("1.1.0").unwrap();
        let updates = apply_bump_set(&root, &set, &next, false).unwrap();

        assert_eq!(updates.len(), 3);
        assert!(updates[0].changed);
        assert_eq!(updates[0].previous.as_deref(), Some("1.0.0"));
        assert!(!updates[1].changed);
        assert!(!updates[2].changed);
        assert_eq!(updates[2].previous, None);

        assert_eq!(
            fs::read_to_string(root.join("package.json")).unwrap(),
            "{\n  \"name\": \"x\",\n  \"version\": \"1.1.0\"\n}\n"
        );
        assert_eq!(fs::read_to_string(root.join("Cargo.toml")).unwrap(), "[package]\nname = \"x\"\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (_tmp, root) = scratch();
        let before = "{\"version\": \"1.0.0\"}";
        write(&root, "package.json", before);
        let next = SemanticVersion::parse("2.0.0").unwrap();
        let updates = apply_bump_set(&root, &[json("package.json")], &next, true).unwrap();
        assert!(updates[0].changed);
        assert_eq!(fs::read_to_string(root.join("package.json")).unwrap(), before);
    }

    #[test]
    fn invalid_json_aborts_before_later_files() {
        let (_tmp, root) = scratch();
        write(&root, "package.json", "{ nope");
        write(&root, "VERSION", "1.0.0\n");
        let set = vec![json("package.json"), FileDescriptor::new("VERSION", FileKind::PlainText)];
        let next = SemanticVersion::parse("1.0.1").unwrap();
        let err = apply_bump_set(&root, &set, &next, false).unwrap_err();
        assert!(matches!(err, UpdateError::Format { ref path, .. } if path == "package.json"));
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "1.0.0\n");
    }

    #[test]
    fn unknown_configured_type_is_reported_with_path() {
        let mut config = Config::default();
        config.files.bump = vec![FileEntry::Spec {
            path: "notes.md".into(),
            file_type: None,
            key: None,
        }];
        let err = configured_bump_files(&config).unwrap_err();
        assert!(matches!(err, UpdateError::Format { ref path, .. } if path == "notes.md"));

        config.files.bump = vec![FileEntry::Spec {
            path: "notes.md".into(),
            file_type: Some(FileType::PlainText),
            key: None,
        }];
        assert_eq!(configured_bump_files(&config).unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, root) = scratch();
        let path = root.join("VERSION");
        fs::write(&path, "1.0.0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        write_atomic(&path, "1.0.1\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1.0.1\n");
    }
}

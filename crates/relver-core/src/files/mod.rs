//! Version-bearing file formats.
//!
//! Every format is a pair of pure functions over file text:
//! [`FileKind::extract`] reads the current version (or `None` when the file
//! has no recognizable version field) and [`FileKind::apply`] returns the
//! text with only the version replaced.
//!
//! | Kind | Files | Version location |
//! |------|-------|------------------|
//! | `json` | `package.json`, `manifest.json`, ... | string at a key path |
//! | `plain-text` | `VERSION`, `version.txt` | the whole file |
//! | `gradle` | `build.gradle`, `build.gradle.kts` | `version = "..."` |
//! | `cargo` | `Cargo.toml` | first `version = "..."` |
//! | `pyproject` | `pyproject.toml` | first `version = "..."` |
//! | `csproj` | `*.csproj` | `<Version>...</Version>` |
//! | `yaml` | `Chart.yaml`, `pubspec.yaml` | top-level `version:` |

mod json;
mod pattern;
mod plain;

pub use pattern::PatternFormat;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading or rewriting a version-bearing file.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The file is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No type was configured and none could be inferred from the name.
    #[error("cannot infer the file type of `{0}`; set `type` explicitly")]
    UnknownType(Utf8PathBuf),
}

/// Result alias for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// A dotted path into a JSON document, e.g. `version` or `packages..version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Split a dotted key path. Empty segments are kept, so `packages..version`
    /// addresses the `""` entry of `packages`.
    pub fn parse(dotted: &str) -> Self {
        Self(dotted.split('.').map(str::to_string).collect())
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Default for KeyPath {
    fn default() -> Self {
        Self(vec!["version".to_string()])
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// How a file stores its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// JSON document with the version as a string at `key`.
    Json {
        /// Where the version lives.
        key: KeyPath,
    },
    /// The whole file is the version.
    PlainText,
    /// One line in a build-tool manifest.
    Pattern(PatternFormat),
}

impl FileKind {
    /// Read the version from file contents.
    ///
    /// Returns `Ok(None)` when the file has no version field.
    pub fn extract(&self, contents: &str) -> FormatResult<Option<String>> {
        match self {
            Self::Json { key } => json::extract(contents, key),
            Self::PlainText => Ok(plain::extract(contents)),
            Self::Pattern(format) => Ok(format.extract(contents)),
        }
    }

    /// Return `contents` with the version replaced by `next`.
    ///
    /// Files without a version field come back unchanged.
    pub fn apply(&self, contents: &str, next: &str) -> FormatResult<String> {
        match self {
            Self::Json { key } => json::apply(contents, key, next),
            Self::PlainText => Ok(plain::apply(contents, next)),
            Self::Pattern(format) => Ok(format.apply(contents, next)),
        }
    }

    /// Guess the kind from a file name.
    pub fn infer(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        let lower = name.to_ascii_lowercase();

        if lower.ends_with(".json") {
            return Some(Self::Json {
                key: KeyPath::default(),
            });
        }

        match lower.as_str() {
            "version" | "version.txt" => return Some(Self::PlainText),
            "build.gradle" | "build.gradle.kts" => return Some(Self::Pattern(PatternFormat::Gradle)),
            "cargo.toml" => return Some(Self::Pattern(PatternFormat::Cargo)),
            "pyproject.toml" => return Some(Self::Pattern(PatternFormat::Pyproject)),
            _ => {}
        }

        match path.extension() {
            Some("csproj") => Some(Self::Pattern(PatternFormat::Csproj)),
            Some("yaml" | "yml") => Some(Self::Pattern(PatternFormat::Yaml)),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { key } => write!(f, "json ({key})"),
            Self::PlainText => write!(f, "plain-text"),
            Self::Pattern(format) => write!(f, "{format}"),
        }
    }
}

/// File type names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    /// JSON with a version key.
    Json,
    /// Whole-file version.
    PlainText,
    /// Gradle build script.
    Gradle,
    /// Cargo manifest.
    Cargo,
    /// Python project metadata.
    Pyproject,
    /// MSBuild project.
    Csproj,
    /// YAML manifest with a top-level `version:`.
    Yaml,
}

/// A version file as written in configuration.
///
/// Either a bare path (type inferred from the name) or a table:
///
/// ```toml
/// [files]
/// bump = [
///     "package.json",
///     { path = "VERSION", type = "plain-text" },
///     { path = "app/manifest.json", key = "meta.version" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FileEntry {
    /// Path only.
    Path(Utf8PathBuf),
    /// Path with explicit type and/or key.
    Spec {
        /// Path relative to the project root.
        path: Utf8PathBuf,
        /// File type; inferred from the name when omitted.
        #[serde(rename = "type", default)]
        file_type: Option<FileType>,
        /// JSON key path (dotted); defaults to `version`.
        #[serde(default)]
        key: Option<String>,
    },
}

impl FileEntry {
    /// The configured path, whichever shape the entry has.
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Path(path) | Self::Spec { path, .. } => path,
        }
    }
}

/// A file that records the project version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDescriptor {
    /// Path relative to the project root.
    pub path: Utf8PathBuf,
    /// How the version is stored.
    pub kind: FileKind,
}

impl FileDescriptor {
    /// Describe a file with a known kind.
    pub fn new(path: impl Into<Utf8PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Describe a file, inferring its kind from the name.
    pub fn infer(path: impl Into<Utf8PathBuf>) -> FormatResult<Self> {
        let path = path.into();
        let kind = FileKind::infer(&path).ok_or_else(|| FormatError::UnknownType(path.clone()))?;
        Ok(Self { path, kind })
    }

    /// Resolve a configuration entry.
    pub fn from_entry(entry: &FileEntry) -> FormatResult<Self> {
        match entry {
            FileEntry::Path(path) => Self::infer(path.clone()),
            FileEntry::Spec {
                path,
                file_type,
                key,
            } => {
                let key = key.as_deref().map_or_else(KeyPath::default, KeyPath::parse);
                let kind = match file_type {
                    None => match FileKind::infer(path) {
                        Some(FileKind::Json { .. }) => FileKind::Json { key },
                        Some(kind) => kind,
                        None => return Err(FormatError::UnknownType(path.clone())),
                    },
                    Some(FileType::Json) => FileKind::Json { key },
                    Some(FileType::PlainText) => FileKind::PlainText,
                    Some(FileType::Gradle) => FileKind::Pattern(PatternFormat::Gradle),
                    Some(FileType::Cargo) => FileKind::Pattern(PatternFormat::Cargo),
                    Some(FileType::Pyproject) => FileKind::Pattern(PatternFormat::Pyproject),
                    Some(FileType::Csproj) => FileKind::Pattern(PatternFormat::Csproj),
                    Some(FileType::Yaml) => FileKind::Pattern(PatternFormat::Yaml),
                };
                Ok(Self::new(path.clone(), kind))
            }
        }
    }
}

//! Configuration loading and discovery.
//!
//! Sources are layered with `figment`, lowest precedence first:
//! 1. Built-in defaults ([`Config::default`])
//! 2. User config: `~/.config/relver/config.<ext>`
//! 3. Project config: `.relver.<ext>` or `relver.<ext>` in the search
//!    directory or a parent, stopping at a `.git` boundary
//! 4. Explicit files passed with [`ConfigLoader::with_file`], in order
//!
//! Where `<ext>` is one of `toml`, `yaml`, `yml`, `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use relver_core::config::ConfigLoader;
//!
//! let cwd = Utf8PathBuf::from(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! assert_eq!(config.git.tag_prefix, "v");
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::files::FileEntry;

/// Default header written above the newest release in the changelog.
pub const DEFAULT_CHANGELOG_HEADER: &str =
    "# Changelog\n\nAll notable changes to this project will be documented in this file.\n";

/// The configuration for relver.
///
/// Every section has working defaults, so an empty file (or no file at all)
/// describes a Node-style project with `package.json` and `CHANGELOG.md`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Version-bearing files.
    pub files: FilesConfig,
    /// Changelog location and header.
    pub changelog: ChangelogConfig,
    /// Commit and tag settings.
    pub git: GitConfig,
    /// Pipeline steps to skip.
    pub skip: SkipConfig,
    /// Lifecycle hook commands.
    pub hooks: HooksConfig,
}

/// Which files carry the version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilesConfig {
    /// Candidates for the authoritative version, first hit wins.
    ///
    /// Empty means the built-in list (`package.json`, `bower.json`,
    /// `manifest.json`).
    pub package: Vec<FileEntry>,
    /// Extra files to rewrite on every bump, ahead of the built-in defaults.
    pub bump: Vec<FileEntry>,
    /// Glob rules naming files that must never be written.
    pub ignore_file: Utf8PathBuf,
    /// Fall back to the highest version tag when no package file is found.
    pub tag_fallback: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            package: Vec::new(),
            bump: Vec::new(),
            ignore_file: Utf8PathBuf::from(".gitignore"),
            tag_fallback: true,
        }
    }
}

/// Changelog file settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Path relative to the project root.
    pub path: Utf8PathBuf,
    /// Text placed above the newest release.
    ///
    /// Must not itself look like a release section (a versioned heading or
    /// an `<a name=...>` anchor).
    pub header: String,
    /// `git-cliff` config file, relative to the project root. Unset lets
    /// `git-cliff` find its own.
    pub cliff_config: Option<Utf8PathBuf>,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("CHANGELOG.md"),
            header: DEFAULT_CHANGELOG_HEADER.to_string(),
            cliff_config: None,
        }
    }
}

/// Commit and tag settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Prefix prepended to the version to form the tag name.
    pub tag_prefix: String,
    /// Commit message template; `{version}` and `{tag}` are interpolated.
    pub commit_message: String,
    /// GPG-sign the commit and tag.
    pub sign: bool,
    /// Pass `--no-verify` to `git commit`.
    pub no_verify: bool,
    /// Commit all staged changes, not just the files relver touched.
    pub commit_all: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            tag_prefix: "v".to_string(),
            commit_message: "chore(release): {tag}".to_string(),
            sign: false,
            no_verify: false,
            commit_all: false,
        }
    }
}

/// Pipeline steps to skip.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SkipConfig {
    /// Leave version files untouched.
    pub bump: bool,
    /// Leave the changelog untouched.
    pub changelog: bool,
    /// Do not commit.
    pub commit: bool,
    /// Do not tag.
    pub tag: bool,
}

/// Shell commands to run at each lifecycle point.
///
/// Commands run one after another through `sh -c` in the project root and
/// support `{version}`, `{prev_version}`, `{tag}` and `{changelog_path}`.
/// A failing command aborts the release.
///
/// # Example
///
/// ```toml
/// [hooks]
/// post_version = ["./scripts/pick-version {version}"]
/// post_bump = ["cargo update --workspace"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HooksConfig {
    /// Before the current version is read.
    pub pre_bump: Vec<String>,
    /// After the next version is resolved. The last non-empty line printed
    /// on stdout replaces the resolved version.
    pub post_version: Vec<String>,
    /// After version files are rewritten.
    pub post_bump: Vec<String>,
    /// After the changelog is merged.
    pub post_changelog: Vec<String>,
    /// After the release commit.
    pub post_commit: Vec<String>,
    /// After the tag is created.
    pub post_tag: Vec<String>,
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

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

const APP_NAME: &str = "relver";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    /// Stop walking up at a directory containing this entry.
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that includes user config and stops at `.git`.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/relver/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop the project search at a parent directory containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file. Later files take precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            tracing::debug!(path = %user_config, "user config");
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            tracing::debug!(path = %project_config, "project config");
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            if !file.is_file() {
                return Err(ConfigError::MissingFile(file.clone()));
            }
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            changelog = %config.changelog.path,
            "configuration loaded"
        );
        Ok(config)
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
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

            // The directory holding the marker is the last one searched.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file without loading it.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().find_project_config(start.as_ref())
}

/// The user config directory: `~/.config/relver/` on Linux,
/// `~/Library/Application Support/relver/` on macOS.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileType;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn load_toml(contents: &str) -> Config {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.changelog.path, "CHANGELOG.md");
        assert_eq!(config.git.tag_prefix, "v");
        assert_eq!(config.git.commit_message, "chore(release): {tag}");
        assert_eq!(config.files.ignore_file, ".gitignore");
        assert!(config.files.tag_fallback);
        assert_eq!(config.skip, SkipConfig::default());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base.toml");
        let over = tmp.path().join("override.toml");
        fs::write(&base, "log_level = \"debug\"\n[git]\ntag_prefix = \"release-\"\n").unwrap();
        fs::write(&over, "log_level = \"error\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(base))
            .with_file(utf8(over))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        // Untouched keys from the earlier file survive.
        assert_eq!(config.git.tag_prefix, "release-");
        assert_eq!(config.git.commit_message, "chore(release): {tag}");
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("project");
        let deep = project.join("src").join("deep");
        fs::create_dir_all(&deep).unwrap();
        fs::write(project.join(".relver.toml"), "log_level = \"debug\"").unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(utf8(deep))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".relver.toml"), "log_level = \"warn\"").unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(utf8(work))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_beside_boundary_is_found() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        let work = repo.join("src");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join(".relver.toml"), "log_level = \"warn\"").unwrap();

        let found = find_project_config(utf8(work)).unwrap();
        assert_eq!(found, utf8(repo.join(".relver.toml")));
    }

    #[test]
    fn test_yaml_and_json_project_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("relver.yaml"), "skip:\n  tag: true\n").unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(utf8(tmp.path().to_path_buf()))
            .load()
            .unwrap();
        assert!(config.skip.tag);
        assert!(!config.skip.commit);

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".relver.json"), r#"{"changelog": {"path": "HISTORY.md"}}"#)
            .unwrap();
        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_project_search(utf8(tmp.path().to_path_buf()))
            .load()
            .unwrap();
        assert_eq!(config.changelog.path, "HISTORY.md");
        assert_eq!(config.changelog.header, DEFAULT_CHANGELOG_HEADER);
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let err = ConfigLoader::new()
            .with_user_config(false)
            .with_file("/definitely/not/here.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_files_section_accepts_paths_and_tables() {
        let config = load_toml(
            r#"
[files]
tag_fallback = false
package = ["VERSION"]
bump = [
    "Cargo.toml",
    { path = "app/manifest.json", key = "meta.version" },
    { path = "RELEASE", type = "plain-text" },
]
"#,
        );
        assert!(!config.files.tag_fallback);
        assert_eq!(config.files.package, vec![FileEntry::Path("VERSION".into())]);
        assert_eq!(config.files.bump.len(), 3);
        assert_eq!(
            config.files.bump[2],
            FileEntry::Spec {
                path: "RELEASE".into(),
                file_type: Some(FileType::PlainText),
                key: None,
            }
        );
    }

    #[test]
    fn test_hooks_section() {
        let config = load_toml(
            r#"
[hooks]
pre_bump = ["echo start"]
post_version = ["echo 9.9.9"]
post_tag = ["echo {tag}", "echo done"]
"#,
        );
        assert_eq!(config.hooks.pre_bump, vec!["echo start"]);
        assert_eq!(config.hooks.post_version, vec!["echo 9.9.9"]);
        assert_eq!(config.hooks.post_tag.len(), 2);
        assert!(config.hooks.post_bump.is_empty());
    }

    #[test]
    fn test_git_section() {
        let config = load_toml(
            r#"
[git]
commit_message = "release {version}"
sign = true
no_verify = true
"#,
        );
        assert_eq!(config.git.commit_message, "release {version}");
        assert!(config.git.sign);
        assert!(config.git.no_verify);
        assert!(!config.git.commit_all);
        assert_eq!(config.git.tag_prefix, "v");
    }

    #[test]
    fn test_changelog_section() {
        let config = load_toml("[changelog]\ncliff_config = \".github/cliff.toml\"\n");
        assert_eq!(config.changelog.cliff_config.as_deref(), Some(Utf8Path::new(".github/cliff.toml")));
        assert_eq!(config.changelog.path, "CHANGELOG.md");
        assert!(Config::default().changelog.cliff_config.is_none());
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "log_level = \"loud\"").unwrap();
        let err = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }

    #[test]
    fn test_find_project_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("relver.toml"), "").unwrap();
        let found = find_project_config(utf8(tmp.path().to_path_buf())).unwrap();
        assert_eq!(found.file_name(), Some("relver.toml"));
    }
}

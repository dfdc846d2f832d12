//! Build-tool manifests where the version sits on one recognizable line.
//!
//! Each format is a regex with three groups: prefix, version, suffix. Only
//! the first match is touched.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static GRADLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*version[ \t]*=?[ \t]*["'])([^"'\r\n]+)(["'])"#)
        .expect("gradle version regex")
});

static TOML: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(version[ \t]*=[ \t]*["'])([^"'\r\n]+)(["'])"#).expect("toml version regex")
});

static CSPROJ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<Version>[ \t]*)([^<\s]+)([ \t]*</Version>)").expect("csproj version regex")
});

static YAML: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(version:[ \t]*["']?)([^"'\s#]+)(["']?)"#).expect("yaml version regex")
});

/// Line-oriented manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFormat {
    /// `version = '1.0.0'` in `build.gradle` / `build.gradle.kts`.
    Gradle,
    /// First unindented `version = "..."` in `Cargo.toml`.
    Cargo,
    /// First unindented `version = "..."` in `pyproject.toml`.
    Pyproject,
    /// `<Version>...</Version>` in an MSBuild project.
    Csproj,
    /// Top-level `version:` in a YAML manifest.
    Yaml,
}

impl PatternFormat {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Gradle => &GRADLE,
            Self::Cargo | Self::Pyproject => &TOML,
            Self::Csproj => &CSPROJ,
            Self::Yaml => &YAML,
        }
    }

    pub(super) fn extract(self, contents: &str) -> Option<String> {
        self.regex()
            .captures(contents)
            .map(|caps| caps[2].to_string())
    }

    pub(super) fn apply(self, contents: &str, next: &str) -> String {
        self.regex()
            .replacen(contents, 1, |caps: &Captures<'_>| {
                format!("{}{next}{}", &caps[1], &caps[3])
            })
            .into_owned()
    }
}

impl fmt::Display for PatternFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gradle => "gradle",
            Self::Cargo => "cargo",
            Self::Pyproject => "pyproject",
            Self::Csproj => "csproj",
            Self::Yaml => "yaml",
        })
    }
}

//! Next-version resolution.
//!
//! [`resolve()`] is a pure function of the current version and a
//! [`BumpRequest`]. Rules, highest precedence first:
//!
//! 1. **Explicit version**: the literal target wins. A separately requested
//!    prerelease identifier must agree with the target's own. The counter
//!    advances when the target lands on the current prerelease train and
//!    restarts at `0` otherwise.
//! 2. **Prerelease continuation**: advance the current train, or start a new
//!    one on top of a normal bump.
//! 3. **Release type** (explicit or automatic): bump that component. A
//!    `major` coming from automatic detection on a `0.x` project is treated
//!    as `minor`; an explicit `major` is always honored.
//! 4. No release type at all is [`VersionError::NoReleaseNecessary`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{Prerelease, SemanticVersion, VersionError, VersionResult, step};

/// Which component a release bumps.
///
/// Variants are ordered by rank: `Patch < Minor < Major`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

impl FromStr for ReleaseType {
    type Err = VersionError;

    fn from_str(s: &str) -> VersionResult<Self> {
        match s {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            other => Err(VersionError::InvalidReleaseType(other.to_string())),
        }
    }
}

/// Keywords that name a kind of bump rather than a version.
const RELEASE_KEYWORDS: &[&str] = &[
    "major",
    "minor",
    "patch",
    "premajor",
    "preminor",
    "prepatch",
    "prerelease",
];

/// Whether `text` is a release-type keyword (`minor`, `prepatch`, ...).
pub fn is_release_keyword(text: &str) -> bool {
    RELEASE_KEYWORDS.contains(&text)
}

/// What the caller asked for. Built once per run, consumed by [`resolve()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpRequest {
    /// Let commit analysis decide. `hint` is `None` when nothing warrants a release.
    Automatic {
        /// Release type recommended by the notes generator.
        hint: Option<ReleaseType>,
        /// Prerelease identifier to release under.
        prerelease: Option<String>,
    },
    /// Caller-specified release type, validated during resolution.
    ReleaseType {
        /// Raw release type text (`major`, `minor` or `patch`).
        release_type: String,
        /// Prerelease identifier to release under.
        prerelease: Option<String>,
    },
    /// Caller-specified literal version.
    Version {
        /// Raw version text, may carry its own prerelease and build metadata.
        version: String,
        /// Prerelease identifier to release under.
        prerelease: Option<String>,
    },
    /// Advance the prerelease train named by `identifier`.
    ContinuePrerelease {
        /// Train to advance or start.
        identifier: String,
        /// Release type used when a new train has to be started.
        hint: Option<ReleaseType>,
    },
}

/// Compute the next version.
#[instrument(level = "debug", skip_all, fields(%current, ?request))]
pub fn resolve(current: &SemanticVersion, request: &BumpRequest) -> VersionResult<SemanticVersion> {
    let next = match request {
        BumpRequest::Version {
            version,
            prerelease,
        } => explicit_version(current, version, prerelease.as_deref())?,
        BumpRequest::ContinuePrerelease { identifier, hint } => {
            let level = hint.map(|h| guard_pre_major(current, h));
            continue_prerelease(current, identifier, level)?
        }
        BumpRequest::ReleaseType {
            release_type,
            prerelease,
        } => {
            let level: ReleaseType = release_type.parse()?;
            bump(current, level, prerelease.as_deref())?
        }
        BumpRequest::Automatic { hint, prerelease } => {
            let level = hint.ok_or(VersionError::NoReleaseNecessary)?;
            bump(
                current,
                guard_pre_major(current, level),
                prerelease.as_deref(),
            )?
        }
    };

    debug!(%next, "resolved next version");
    Ok(next)
}

/// Substitute a caller-supplied replacement for the resolved version.
///
/// Blank replacements keep `resolved`. A replacement that names a release
/// type instead of a version is ignored with a warning.
pub fn apply_override(
    resolved: SemanticVersion,
    replacement: Option<&str>,
) -> VersionResult<SemanticVersion> {
    let Some(text) = replacement.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(resolved);
    };

    if is_release_keyword(text) {
        warn!(
            replacement = text,
            %resolved,
            "version override names a release type, keeping resolved version"
        );
        return Ok(resolved);
    }

    let replaced = SemanticVersion::parse(text)
        .map_err(|_| VersionError::InvalidReleaseVersion(text.to_string()))?;
    debug!(%resolved, %replaced, "version overridden");
    Ok(replaced)
}

/// Automatic `major` on a `0.x` project becomes `minor`.
fn guard_pre_major(current: &SemanticVersion, level: ReleaseType) -> ReleaseType {
    if current.major == 0 && level == ReleaseType::Major {
        debug!(%current, "pre-major project, treating automatic major bump as minor");
        ReleaseType::Minor
    } else {
        level
    }
}

fn explicit_version(
    current: &SemanticVersion,
    version: &str,
    prerelease: Option<&str>,
) -> VersionResult<SemanticVersion> {
    let target = SemanticVersion::parse(version)
        .map_err(|_| VersionError::InvalidReleaseVersion(version.to_string()))?;

    let Some(identifier) = prerelease else {
        return Ok(target);
    };

    if let Some(own) = target.prerelease_identifier()
        && own != identifier
    {
        return Err(VersionError::ConflictingPrerelease {
            version: version.to_string(),
            prerelease: identifier.to_string(),
        });
    }

    // The target's own number is ignored: same train advances, otherwise restart.
    let pre = match current.prerelease {
        Some(ref cur) if current.same_core(&target) && cur.identifier == identifier => {
            cur.next()?
        }
        _ => Prerelease::new(identifier, 0),
    };

    Ok(target.core().with_prerelease(pre).with_build(target.build))
}

fn continue_prerelease(
    current: &SemanticVersion,
    identifier: &str,
    level: Option<ReleaseType>,
) -> VersionResult<SemanticVersion> {
    match current.prerelease {
        Some(ref pre) if pre.identifier == identifier => {
            Ok(current.core().with_prerelease(pre.next()?))
        }
        _ => Ok(increment(current, level.unwrap_or(ReleaseType::Patch))?
            .with_prerelease(Prerelease::new(identifier, 0))),
    }
}

fn bump(
    current: &SemanticVersion,
    level: ReleaseType,
    prerelease: Option<&str>,
) -> VersionResult<SemanticVersion> {
    let Some(identifier) = prerelease else {
        return increment(current, level);
    };

    // Already on a prerelease at least as significant as the request: stay on it.
    if current.is_prerelease()
        && active_level(current).is_some_and(|active| active >= level)
    {
        let pre = match current.prerelease {
            Some(ref pre) if pre.identifier == identifier => pre.next()?,
            _ => Prerelease::new(identifier, 0),
        };
        return Ok(current.core().with_prerelease(pre));
    }

    Ok(pre_increment(current, level)?.with_prerelease(Prerelease::new(identifier, 0)))
}

/// The least significant non-zero component.
const fn active_level(v: &SemanticVersion) -> Option<ReleaseType> {
    if v.patch != 0 {
        Some(ReleaseType::Patch)
    } else if v.minor != 0 {
        Some(ReleaseType::Minor)
    } else if v.major != 0 {
        Some(ReleaseType::Major)
    } else {
        None
    }
}

/// Bump one component. A prerelease whose lower components are already zero
/// graduates to its release instead (`1.1.0-rc.1` + minor = `1.1.0`).
fn increment(v: &SemanticVersion, level: ReleaseType) -> VersionResult<SemanticVersion> {
    let pre = v.is_prerelease();
    match level {
        ReleaseType::Major if pre && v.minor == 0 && v.patch == 0 => Ok(v.core()),
        ReleaseType::Minor if pre && v.patch == 0 => Ok(v.core()),
        ReleaseType::Patch if pre => Ok(v.core()),
        _ => pre_increment(v, level),
    }
}

/// Bump one component without graduation, for starting a new prerelease train.
fn pre_increment(v: &SemanticVersion, level: ReleaseType) -> VersionResult<SemanticVersion> {
    Ok(match level {
        ReleaseType::Major => SemanticVersion::new(step(v.major, "major")?, 0, 0),
        ReleaseType::Minor => SemanticVersion::new(v.major, step(v.minor, "minor")?, 0),
        ReleaseType::Patch => SemanticVersion::new(v.major, v.minor, step(v.patch, "patch")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn auto(hint: Option<ReleaseType>) -> BumpRequest {
        BumpRequest::Automatic {
            hint,
            prerelease: None,
        }
    }

    fn explicit_type(t: &str, prerelease: Option<&str>) -> BumpRequest {
        BumpRequest::ReleaseType {
            release_type: t.into(),
            prerelease: prerelease.map(String::from),
        }
    }

    fn explicit_version(version: &str, prerelease: Option<&str>) -> BumpRequest {
        BumpRequest::Version {
            version: version.into(),
            prerelease: prerelease.map(String::from),
        }
    }

    fn cont(identifier: &str) -> BumpRequest {
        BumpRequest::ContinuePrerelease {
            identifier: identifier.into(),
            hint: None,
        }
    }

    #[test]
    fn automatic_bumps() {
        let cur = v("1.2.3");
        assert_eq!(resolve(&cur, &auto(Some(ReleaseType::Patch))).unwrap(), v("1.2.4"));
        assert_eq!(resolve(&cur, &auto(Some(ReleaseType::Minor))).unwrap(), v("1.3.0"));
        assert_eq!(resolve(&cur, &auto(Some(ReleaseType::Major))).unwrap(), v("2.0.0"));
    }

    #[test]
    fn automatic_major_on_pre_major_becomes_minor() {
        let cur = v("0.5.0");
        assert_eq!(resolve(&cur, &auto(Some(ReleaseType::Major))).unwrap(), v("0.6.0"));
    }

    #[test]
    fn explicit_major_on_pre_major_is_honored() {
        let cur = v("0.5.0");
        assert_eq!(resolve(&cur, &explicit_type("major", None)).unwrap(), v("1.0.0"));
    }

    #[test]
    fn automatic_without_hint_is_no_release() {
        let err = resolve(&v("1.0.0"), &auto(None)).unwrap_err();
        assert_eq!(err, VersionError::NoReleaseNecessary);
        let err = resolve(
            &v("1.0.0"),
            &BumpRequest::Automatic {
                hint: None,
                prerelease: Some("dev".into()),
            },
        )
        .unwrap_err();
        assert!(err.is_no_release());
    }

    #[test]
    fn explicit_type_is_validated() {
        let err = resolve(&v("1.0.0"), &explicit_type("huge", None)).unwrap_err();
        assert_eq!(err, VersionError::InvalidReleaseType("huge".into()));
    }

    #[test]
    fn bump_drops_build_metadata() {
        assert_eq!(
            resolve(&v("1.0.0+sha.abc"), &explicit_type("patch", None)).unwrap(),
            v("1.0.1")
        );
    }

    #[test]
    fn prerelease_graduates_on_plain_bump() {
        assert_eq!(resolve(&v("1.0.1-dev.3"), &explicit_type("patch", None)).unwrap(), v("1.0.1"));
        assert_eq!(resolve(&v("1.1.0-rc.1"), &explicit_type("minor", None)).unwrap(), v("1.1.0"));
        assert_eq!(resolve(&v("2.0.0-rc.1"), &explicit_type("major", None)).unwrap(), v("2.0.0"));
        assert_eq!(resolve(&v("1.0.1-rc.1"), &explicit_type("minor", None)).unwrap(), v("1.1.0"));
    }

    #[test]
    fn release_type_with_prerelease_starts_train() {
        assert_eq!(
            resolve(&v("1.0.0"), &explicit_type("minor", Some("beta"))).unwrap(),
            v("1.1.0-beta.0")
        );
        assert_eq!(
            resolve(&v("1.0.0"), &explicit_type("major", Some("rc"))).unwrap(),
            v("2.0.0-rc.0")
        );
    }

    #[test]
    fn continuation_advances_train() {
        assert_eq!(resolve(&v("1.0.1-dev.0"), &cont("dev")).unwrap(), v("1.0.1-dev.1"));
    }

    #[test]
    fn continuation_on_release_starts_patch_train() {
        assert_eq!(resolve(&v("1.0.0"), &cont("dev")).unwrap(), v("1.0.1-dev.0"));
    }

    #[test]
    fn continuation_uses_hint_for_new_train() {
        let req = BumpRequest::ContinuePrerelease {
            identifier: "beta".into(),
            hint: Some(ReleaseType::Minor),
        };
        assert_eq!(resolve(&v("1.0.0"), &req).unwrap(), v("1.1.0-beta.0"));
    }

    #[test]
    fn continuation_switches_identifier_in_place() {
        assert_eq!(resolve(&v("1.0.1-alpha.4"), &cont("beta")).unwrap(), v("1.0.1-beta.0"));
    }

    #[test]
    fn changing_type_while_prerelease_starts_new_train() {
        assert_eq!(
            resolve(&v("1.0.1-dev.0"), &explicit_type("minor", Some("dev"))).unwrap(),
            v("1.1.0-dev.0")
        );
    }

    #[test]
    fn lower_type_while_prerelease_continues_train() {
        assert_eq!(
            resolve(&v("1.1.0-dev.2"), &explicit_type("patch", Some("dev"))).unwrap(),
            v("1.1.0-dev.3")
        );
        assert_eq!(
            resolve(&v("1.0.1-dev.2"), &explicit_type("patch", Some("dev"))).unwrap(),
            v("1.0.1-dev.3")
        );
    }

    #[test]
    fn explicit_version_is_literal() {
        assert_eq!(
            resolve(&v("1.0.0"), &explicit_version("v3.1.4+build.9", None)).unwrap(),
            v("3.1.4+build.9")
        );
    }

    #[test]
    fn explicit_version_must_parse() {
        let err = resolve(&v("1.0.0"), &explicit_version("next", None)).unwrap_err();
        assert_eq!(err, VersionError::InvalidReleaseVersion("next".into()));
    }

    #[test]
    fn explicit_version_with_matching_train_increments() {
        assert_eq!(
            resolve(&v("100.0.0-amazing.0"), &explicit_version("100.0.0", Some("amazing"))).unwrap(),
            v("100.0.0-amazing.1")
        );
    }

    #[test]
    fn explicit_version_keeps_build_while_incrementing() {
        assert_eq!(
            resolve(
                &v("100.0.0-amazing.0"),
                &explicit_version("100.0.0-amazing.0+build.1234", Some("amazing"))
            )
            .unwrap(),
            v("100.0.0-amazing.1+build.1234")
        );
    }

    #[test]
    fn explicit_version_on_new_core_starts_at_zero() {
        assert_eq!(
            resolve(&v("1.0.0"), &explicit_version("2.0.0", Some("rc"))).unwrap(),
            v("2.0.0-rc.0")
        );
    }

    #[test]
    fn explicit_version_ignores_literal_prerelease_number() {
        assert_eq!(
            resolve(&v("1.0.0"), &explicit_version("2.0.0-rc.5", Some("rc"))).unwrap(),
            v("2.0.0-rc.0")
        );
        assert_eq!(
            resolve(&v("100.0.0-amazing.0"), &explicit_version("100.0.0-amazing.5", Some("amazing")))
                .unwrap(),
            v("100.0.0-amazing.1")
        );
    }

    #[test]
    fn explicit_version_on_other_train_restarts() {
        assert_eq!(
            resolve(&v("2.0.0-beta.3"), &explicit_version("2.0.0", Some("rc"))).unwrap(),
            v("2.0.0-rc.0")
        );
        assert_eq!(
            resolve(&v("1.0.0-rc.3"), &explicit_version("2.0.0-rc.7", Some("rc"))).unwrap(),
            v("2.0.0-rc.0")
        );
    }

    #[test]
    fn component_overflow_is_an_error() {
        let top = u64::MAX;
        for (current, level) in [
            (SemanticVersion::new(top, 0, 0), "major"),
            (SemanticVersion::new(1, top, 0), "minor"),
            (SemanticVersion::new(1, 0, top), "patch"),
        ] {
            let err = resolve(&current, &explicit_type(level, None)).unwrap_err();
            assert!(matches!(err, VersionError::InvalidVersion { .. }), "{level}");
        }

        let train = SemanticVersion::new(1, 0, 1).with_prerelease(Prerelease::new("dev", top));
        assert!(resolve(&train, &cont("dev")).is_err());
    }

    #[test]
    fn explicit_version_conflicting_prerelease() {
        let err = resolve(&v("1.0.0"), &explicit_version("1.2.3-amazing.2", Some("awesome")))
            .unwrap_err();
        assert!(matches!(err, VersionError::ConflictingPrerelease { .. }));
    }

    #[test]
    fn override_replaces_version() {
        let out = apply_override(v("1.1.0"), Some(" 1.1.0-hotfix.1\n")).unwrap();
        assert_eq!(out, v("1.1.0-hotfix.1"));
    }

    #[test]
    fn override_keyword_falls_back() {
        assert_eq!(apply_override(v("1.1.0"), Some("minor")).unwrap(), v("1.1.0"));
        assert_eq!(apply_override(v("1.1.0"), Some("prerelease")).unwrap(), v("1.1.0"));
    }

    #[test]
    fn override_blank_keeps_resolved() {
        assert_eq!(apply_override(v("1.1.0"), None).unwrap(), v("1.1.0"));
        assert_eq!(apply_override(v("1.1.0"), Some("  \n")).unwrap(), v("1.1.0"));
    }

    #[test]
    fn override_garbage_is_rejected() {
        let err = apply_override(v("1.1.0"), Some("soon")).unwrap_err();
        assert_eq!(err, VersionError::InvalidReleaseVersion("soon".into()));
    }

    #[test]
    fn release_type_display_and_parse() {
        for t in [ReleaseType::Patch, ReleaseType::Minor, ReleaseType::Major] {
            assert_eq!(t.to_string().parse::<ReleaseType>().unwrap(), t);
        }
        assert!(ReleaseType::Major > ReleaseType::Minor);
    }

    proptest! {
        #[test]
        fn resolve_is_deterministic(
            major in 0u64..5, minor in 0u64..5, patch in 0u64..5,
            pre in proptest::option::of(0u64..4),
            level in prop_oneof![Just("major"), Just("minor"), Just("patch")],
            id in proptest::option::of(Just("dev")),
        ) {
            let mut current = SemanticVersion::new(major, minor, patch);
            if let Some(n) = pre {
                current = current.with_prerelease(Prerelease::new("dev", n));
            }
            let request = explicit_type(level, id);
            let first = resolve(&current, &request);
            let second = resolve(&current, &request);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.unwrap() > current);
        }
    }
}

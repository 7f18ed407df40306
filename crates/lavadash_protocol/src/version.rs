//! Server version parsing.
//!
//! Dashboard servers report `major.minor.micro.releaselevel.serial`
//! (five fields, like an interpreter release tuple). Comparisons are done on
//! a stricter form, `major.minor.micro[{a|b}serial]`, where `final`,
//! `candidate` and `dev` releases drop their qualifier.

use crate::error::{ProtocolError, ProtocolResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Release level of a five-part server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseLevel {
    /// Development snapshot.
    Dev,
    /// Alpha release.
    Alpha,
    /// Beta release.
    Beta,
    /// Release candidate.
    Candidate,
    /// Final release.
    Final,
}

impl ReleaseLevel {
    /// The level's spelling in version strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseLevel::Dev => "dev",
            ReleaseLevel::Alpha => "alpha",
            ReleaseLevel::Beta => "beta",
            ReleaseLevel::Candidate => "candidate",
            ReleaseLevel::Final => "final",
        }
    }
}

impl FromStr for ReleaseLevel {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "dev" => Ok(ReleaseLevel::Dev),
            "alpha" => Ok(ReleaseLevel::Alpha),
            "beta" => Ok(ReleaseLevel::Beta),
            "candidate" => Ok(ReleaseLevel::Candidate),
            "final" => Ok(ReleaseLevel::Final),
            other => Err(ProtocolError::VersionFormat(format!(
                "releaselevel {other:?} is not one of 'final', 'alpha', 'beta', 'candidate' or 'dev'"
            ))),
        }
    }
}

/// Five-part version reported by `version()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Micro component.
    pub micro: u32,
    /// Release level.
    pub level: ReleaseLevel,
    /// Serial within the release level.
    ///
    /// Only alpha and beta serials are read; other levels store `0`.
    pub serial: u32,
}

impl ServerVersion {
    /// Convert to the comparable strict form.
    pub fn to_strict(&self) -> StrictVersion {
        let pre = match self.level {
            ReleaseLevel::Alpha => Some(PreRelease::Alpha(self.serial)),
            ReleaseLevel::Beta => Some(PreRelease::Beta(self.serial)),
            ReleaseLevel::Dev | ReleaseLevel::Candidate | ReleaseLevel::Final => None,
        };
        StrictVersion {
            major: self.major,
            minor: self.minor,
            patch: self.micro,
            pre,
        }
    }
}

impl FromStr for ServerVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, micro, level, serial] = parts.as_slice() else {
            return Err(ProtocolError::VersionFormat(format!(
                "version {s:?} does not follow pattern 'major.minor.micro.releaselevel.serial'"
            )));
        };
        let number = |text: &str| {
            text.parse::<u32>().map_err(|_| {
                ProtocolError::VersionFormat(format!(
                    "version {s:?} has non-numeric component {text:?}"
                ))
            })
        };
        let level: ReleaseLevel = level.parse()?;
        let serial = match level {
            ReleaseLevel::Alpha | ReleaseLevel::Beta => number(serial)?,
            ReleaseLevel::Dev | ReleaseLevel::Candidate | ReleaseLevel::Final => 0,
        };
        Ok(Self {
            major: number(major)?,
            minor: number(minor)?,
            micro: number(micro)?,
            level,
            serial,
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.major,
            self.minor,
            self.micro,
            self.level.as_str(),
            self.serial
        )
    }
}

/// Pre-release qualifier of a [`StrictVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    /// `aN`
    Alpha(u32),
    /// `bN`
    Beta(u32),
}

/// Comparable `major.minor[.patch][{a|b}N]` version.
///
/// A version without a pre-release qualifier sorts after every
/// pre-release of the same `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrictVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component (`0` when omitted).
    pub patch: u32,
    /// Optional pre-release qualifier.
    pub pre: Option<PreRelease>,
}

impl StrictVersion {
    /// Create a final-release version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Full `M.m.p[aN|bN]` spelling, always including the patch.
    pub fn to_full_string(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        push_pre(&mut out, self.pre);
        out
    }
}

fn push_pre(out: &mut String, pre: Option<PreRelease>) {
    match pre {
        Some(PreRelease::Alpha(n)) => out.push_str(&format!("a{n}")),
        Some(PreRelease::Beta(n)) => out.push_str(&format!("b{n}")),
        None => {}
    }
}

impl Ord for StrictVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre, other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for StrictVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for StrictVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        let invalid = || ProtocolError::VersionFormat(format!("invalid version number {s:?}"));

        let (release, pre) = match s.find(['a', 'b']) {
            Some(at) => {
                let serial = s[at + 1..].parse::<u32>().map_err(|_| invalid())?;
                let pre = if s.as_bytes()[at] == b'a' {
                    PreRelease::Alpha(serial)
                } else {
                    PreRelease::Beta(serial)
                };
                (&s[..at], Some(pre))
            }
            None => (s, None),
        };

        let numbers = release
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u32>().map_err(|_| invalid())
            })
            .collect::<ProtocolResult<Vec<u32>>>()?;

        match numbers.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: 0,
                pre,
            }),
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
                pre,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for StrictVersion {
    /// Omits a zero patch, so `0.3.0` prints as `0.3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = if self.patch == 0 {
            format!("{}.{}", self.major, self.minor)
        } else {
            format!("{}.{}.{}", self.major, self.minor, self.patch)
        };
        push_pre(&mut out, self.pre);
        f.write_str(&out)
    }
}

/// Normalize a five-part server version to its strict spelling.
///
/// ```
/// use lavadash_protocol::strict_server_version;
///
/// assert_eq!(strict_server_version("0.4.0.candidate.5").unwrap(), "0.4.0");
/// assert_eq!(strict_server_version("0.4.0.alpha.1").unwrap(), "0.4.0a1");
/// ```
///
/// # Errors
///
/// Returns [`ProtocolError::VersionFormat`] when the input does not have
/// exactly five components or names an unknown release level.
pub fn strict_server_version(version: &str) -> ProtocolResult<String> {
    version
        .parse::<ServerVersion>()
        .map(|v| v.to_strict().to_full_string())
}

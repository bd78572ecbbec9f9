//! Release version and commit hash validation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::ReleaseError;

/// PEP 440 public release: `N(.N)*[{a|b|rc}N][.postN][.devN]`.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)*((a|b|rc)[0-9]+)?(\.post[0-9]+)?(\.dev[0-9]+)?$")
        .expect("valid version regex")
});

static HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid hash regex"));

/// A validated package version, e.g. `0.4.0` or `0.5.0rc1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the branch the main repo upgrade is committed on.
    pub fn upgrade_branch(&self) -> String {
        format!("upgrade-zulip-api-{}", self.0)
    }
}

impl FromStr for ReleaseVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        if VERSION_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ReleaseError::InvalidVersion(s.to_string()))
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abbreviated or full git commit hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHash(String);

impl CommitHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CommitHash {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if HASH_RE.is_match(s) {
            Ok(Self(s.to_lowercase()))
        } else {
            Err(ReleaseError::InvalidHash(s.to_string()))
        }
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The git ref downstream pins point at: the release tag or an explicit commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Tag(ReleaseVersion),
    Commit(CommitHash),
}

impl GitRef {
    pub fn new(version: &ReleaseVersion, hash: Option<&CommitHash>) -> Self {
        match hash {
            Some(h) => GitRef::Commit(h.clone()),
            None => GitRef::Tag(version.clone()),
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Tag(v) => fmt::Display::fmt(v, f),
            GitRef::Commit(h) => fmt::Display::fmt(h, f),
        }
    }
}

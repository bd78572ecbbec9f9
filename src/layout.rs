//! Fixed layout of the API repository.
//!
//! Three packages live side by side at the repository root, each with its own
//! `setup.py`. Version numbers are stamped into fixed files by variable name.

use std::path::{Path, PathBuf};

use crate::error::ReleaseError;
use crate::release::version_files::VariableValue;
use crate::version::ReleaseVersion;

/// Packages released together, in build order.
pub const PACKAGES: [&str; 3] = ["zulip", "zulip_bots", "zulip_botserver"];

/// Variable in `zulip_bots/setup.py` that switches the package into
/// package-index mode while distributions are built.
pub const PYPA_MARKER: &str = "IS_PYPA_PACKAGE";

/// Per-package directories removed by cleanup (besides `<name>.egg-info`).
const ARTIFACT_DIRS: [&str; 3] = ["build", "temp", "dist"];

/// One variable assignment to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTarget {
    pub path: PathBuf,
    pub variable: &'static str,
    pub value: VariableValue,
}

/// A package directory inside the API repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: &'static str,
    pub dir: PathBuf,
}

impl Package {
    pub fn setup_py(&self) -> PathBuf {
        self.dir.join("setup.py")
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.dir.join("dist")
    }

    /// Directories that hold build output for this package.
    pub fn artifact_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = ARTIFACT_DIRS.iter().map(|d| self.dir.join(d)).collect();
        dirs.push(self.dir.join(format!("{}.egg-info", self.name)));
        dirs
    }
}

/// The API repository root and its packages.
#[derive(Debug, Clone)]
pub struct RepoLayout {
    root: PathBuf,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages(&self) -> Vec<Package> {
        PACKAGES
            .iter()
            .map(|&name| Package {
                name,
                dir: self.root.join(name),
            })
            .collect()
    }

    /// Check that every package directory has a `setup.py`.
    pub fn validate(&self) -> Result<(), ReleaseError> {
        for package in self.packages() {
            if !package.setup_py().is_file() {
                return Err(ReleaseError::MissingPackage(package.dir));
            }
        }
        Ok(())
    }

    /// Files and variables that carry the release version.
    pub fn version_targets(&self, version: &ReleaseVersion) -> Vec<VersionTarget> {
        let value = VariableValue::Str(version.to_string());
        vec![
            VersionTarget {
                path: self.root.join("zulip").join("zulip").join("__init__.py"),
                variable: "__version__",
                value: value.clone(),
            },
            VersionTarget {
                path: self.bots_setup(),
                variable: "ZULIP_BOTS_VERSION",
                value: value.clone(),
            },
            VersionTarget {
                path: self.root.join("zulip_botserver").join("setup.py"),
                variable: "ZULIP_BOTSERVER_VERSION",
                value,
            },
        ]
    }

    /// Toggle for [`PYPA_MARKER`].
    pub fn pypa_marker(&self, enabled: bool) -> VersionTarget {
        VersionTarget {
            path: self.bots_setup(),
            variable: PYPA_MARKER,
            value: VariableValue::Bool(enabled),
        }
    }

    fn bots_setup(&self) -> PathBuf {
        self.root.join("zulip_bots").join("setup.py")
    }
}

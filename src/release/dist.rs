//! Source/wheel distribution builds, artifact cleanup and upload.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ReleaseError;
use crate::layout::{Package, RepoLayout};
use crate::tool::{Invocation, ToolRunner, run_checked};

/// Remove the build output directories of a package.
///
/// Directories that don't exist are skipped. Returns the removed paths.
pub fn cleanup(package: &Package) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut removed = Vec::new();

    for dir in package.artifact_dirs() {
        if !dir.is_dir() {
            continue;
        }
        debug!("Removing {}", dir.display());
        std::fs::remove_dir_all(&dir).map_err(|source| ReleaseError::CleanupFailed {
            path: dir.clone(),
            source,
        })?;
        removed.push(dir);
    }

    Ok(removed)
}

/// `<python> setup.py sdist` in the package directory.
pub fn build_sdist<R: ToolRunner + ?Sized>(
    runner: &R,
    python: &str,
    package: &Package,
) -> Result<(), ReleaseError> {
    run_setup(runner, python, package, "sdist")
}

/// `<python> setup.py bdist_wheel` in the package directory.
pub fn build_wheel<R: ToolRunner + ?Sized>(
    runner: &R,
    python: &str,
    package: &Package,
) -> Result<(), ReleaseError> {
    run_setup(runner, python, package, "bdist_wheel")
}

fn run_setup<R: ToolRunner + ?Sized>(
    runner: &R,
    python: &str,
    package: &Package,
    command: &str,
) -> Result<(), ReleaseError> {
    let invocation = Invocation::new(python, &package.dir).args(["setup.py", command]);
    run_checked(runner, &invocation)?;
    Ok(())
}

/// Every file in `<package>/dist/`, sorted for a stable upload order.
///
/// Fails with [`ReleaseError::NoDistributions`] when there is nothing to upload.
pub fn collect_distributions(layout: &RepoLayout) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut dists = Vec::new();

    for package in layout.packages() {
        let dist_dir = package.dist_dir();
        if !dist_dir.is_dir() {
            continue;
        }

        let entries = std::fs::read_dir(&dist_dir).map_err(|source| ReleaseError::ListFailed {
            path: dist_dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| ReleaseError::ListFailed {
                path: dist_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                dists.push(path);
            }
        }
    }

    if dists.is_empty() {
        return Err(ReleaseError::NoDistributions(layout.root().to_path_buf()));
    }

    dists.sort();
    Ok(dists)
}

/// `<twine> upload <files...>` from the repository root.
pub fn upload<R: ToolRunner + ?Sized>(
    runner: &R,
    twine: &str,
    layout: &RepoLayout,
    dists: &[PathBuf],
) -> Result<(), ReleaseError> {
    let invocation = Invocation::new(twine, layout.root())
        .arg("upload")
        .args(dists.iter().map(|p| p.display().to_string()));
    run_checked(runner, &invocation)?;
    Ok(())
}

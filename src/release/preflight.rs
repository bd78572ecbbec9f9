//! Preflight checks for the release pipeline.
//!
//! Validates tools, repository state, tags, branches and the pinned commit
//! before any file is edited or any command with side effects is run.

use std::path::Path;

use git2::{BranchType, Repository};
use tracing::{debug, warn};

use crate::error::ReleaseError;
use crate::layout::RepoLayout;
use crate::tool::{ToolRunner, require_tool};
use crate::version::{CommitHash, ReleaseVersion};

use super::ReleaseConfig;
use super::requirements::REQUIREMENT_FILES;

/// Result of all preflight checks.
#[derive(Debug, Default)]
pub struct PreflightResult {
    /// Branch checked out in the API repository, when pushing.
    pub current_branch: Option<String>,
}

/// Run all checks relevant to the selected stages.
///
/// Checks (in order):
/// 1. Package layout
/// 2. Required tools on PATH
/// 3. API repository state and tag availability (push)
/// 4. Pinned commit exists (hash)
/// 5. Main repo state and branch availability (main repo update)
pub fn run_checks<R: ToolRunner + ?Sized>(
    config: &ReleaseConfig,
    runner: &R,
) -> Result<PreflightResult, ReleaseError> {
    let layout = RepoLayout::new(&config.repo);
    layout.validate()?;

    if config.build {
        require_tool(runner, &config.python)?;
    }
    if config.release {
        require_tool(runner, &config.twine)?;
    }
    if config.push.is_some() || config.main_repo.is_some() {
        require_tool(runner, "git")?;
    }

    let mut result = PreflightResult::default();

    if config.push.is_some() {
        let repo = open_repo(layout.root())?;
        let branch = get_current_branch(&repo, layout.root())?;
        if check_tag_exists(&repo, config.version.as_str()) {
            return Err(ReleaseError::TagAlreadyExists(config.version.to_string()));
        }
        debug!("API repository is on branch {}", branch);
        result.current_branch = Some(branch);
    }

    if let Some(hash) = &config.hash {
        check_commit_exists(layout.root(), hash)?;
    }

    if let Some(main_repo) = &config.main_repo {
        check_main_repo(main_repo, &config.version)?;
    }

    Ok(result)
}

fn open_repo(path: &Path) -> Result<Repository, ReleaseError> {
    Repository::open(path).map_err(|source| ReleaseError::NotARepository {
        path: path.to_path_buf(),
        source,
    })
}

/// Get the current branch name.
fn get_current_branch(repo: &Repository, path: &Path) -> Result<String, ReleaseError> {
    let head = repo.head()?;

    if !head.is_branch() {
        return Err(ReleaseError::DetachedHead(path.to_path_buf()));
    }

    head.shorthand()
        .map(String::from)
        .ok_or_else(|| ReleaseError::DetachedHead(path.to_path_buf()))
}

/// Check if a tag already exists.
pub fn check_tag_exists(repo: &Repository, tag: &str) -> bool {
    repo.find_reference(&format!("refs/tags/{}", tag)).is_ok()
}

/// Check that `hash` names a commit in the API repository.
///
/// Outside a git checkout the hash can't be verified; that only warns.
fn check_commit_exists(api_repo: &Path, hash: &CommitHash) -> Result<(), ReleaseError> {
    let repo = match Repository::open(api_repo) {
        Ok(repo) => repo,
        Err(e) => {
            warn!(
                "Cannot verify commit {}: {} is not a git repository ({})",
                hash,
                api_repo.display(),
                e.message()
            );
            return Ok(());
        }
    };

    repo.revparse_single(hash.as_str())
        .and_then(|obj| obj.peel_to_commit())
        .map(|_| ())
        .map_err(|_| ReleaseError::UnknownCommit {
            hash: hash.to_string(),
            repo: api_repo.to_path_buf(),
        })
}

/// Check the main repo can take the requirements upgrade cleanly.
fn check_main_repo(main_repo: &Path, version: &ReleaseVersion) -> Result<(), ReleaseError> {
    let repo = open_repo(main_repo)?;

    for file in REQUIREMENT_FILES {
        let path = main_repo.join(file);
        if !path.is_file() {
            return Err(ReleaseError::MissingRequirements(path));
        }
        let status = repo.status_file(Path::new(file))?;
        if !status.is_empty() {
            return Err(ReleaseError::UncommittedChanges(path));
        }
    }

    let branch = version.upgrade_branch();
    if repo.find_branch(&branch, BranchType::Local).is_ok() {
        return Err(ReleaseError::BranchAlreadyExists(branch));
    }

    Ok(())
}

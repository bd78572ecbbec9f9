//! Git operations for the release pipeline: commit, tag, push, and rollback.
//!
//! All operations shell out to the system `git` binary through a
//! [`ToolRunner`], inheriting the user's existing git config, SSH agent, and
//! credential store.

use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, ToolError};
use crate::tool::{Invocation, ToolRunner, run_checked};
use crate::version::ReleaseVersion;

/// Outcome of [`commit_release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// False when the files were already committed at this version.
    pub commit_created: bool,
}

/// Commit message for the version bump in the API repository.
pub fn release_commit_message(version: &ReleaseVersion) -> String {
    format!("python-zulip-api: Upgrade package versions to {}.", version)
}

/// Commit message for the requirements bump in the main repo.
pub fn main_repo_commit_message(version: &ReleaseVersion) -> String {
    format!(
        "requirements: Upgrade to version {} of the Zulip API packages.",
        version
    )
}

/// Stage the version files and create the release commit.
///
/// Steps:
/// 1. `git add -- <files>` - stage only the stamped version files
/// 2. `git diff --cached --quiet -- <files>` - skip the commit when they are unchanged
/// 3. `git commit -m "python-zulip-api: Upgrade package versions to X." -- <files>`
///
/// Both the check and the commit are limited to `files`, so anything else
/// sitting in the index stays staged and out of the release commit.
pub fn commit_release<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    version: &ReleaseVersion,
    files: &[PathBuf],
) -> Result<CommitResult, ReleaseError> {
    stage_files(runner, repo, files)?;

    let diff = Invocation::git(repo, ["diff", "--cached", "--quiet", "--"]).args(pathspec(files));
    let staged = runner.execute(&diff)?;
    let commit_created = match staged.code {
        0 => false,
        1 => {
            let message = release_commit_message(version);
            commit_files(runner, repo, &message, files)?;
            true
        }
        code => {
            return Err(ToolError::NonZeroExit {
                command: diff.to_string(),
                code,
                stderr: staged.stderr.trim().to_string(),
            }
            .into());
        }
    };

    Ok(CommitResult { commit_created })
}

/// `git tag -a X -m "Release X"`, annotated so `--follow-tags` pushes it.
pub fn tag_release<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    version: &ReleaseVersion,
) -> Result<(), ToolError> {
    let tag = version.to_string();
    let tag_message = format!("Release {}", version);
    run_checked(
        runner,
        &Invocation::git(repo, ["tag", "-a", &tag, "-m", &tag_message]),
    )?;
    Ok(())
}

/// `git push <remote> HEAD --follow-tags`.
pub fn push_with_tags<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    remote: &str,
) -> Result<(), ToolError> {
    run_checked(
        runner,
        &Invocation::git(repo, ["push", remote, "HEAD", "--follow-tags"]),
    )?;
    Ok(())
}

/// Roll back a failed release: delete the local tag and undo the release commit.
///
/// Uses `--soft` reset so the version bump changes stay staged.
pub fn rollback<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    tag: &str,
    commit_created: bool,
) -> Result<(), ToolError> {
    run_checked(runner, &Invocation::git(repo, ["tag", "-d", tag]))?;

    if commit_created {
        run_checked(runner, &Invocation::git(repo, ["reset", "--soft", "HEAD~1"]))?;
    }

    Ok(())
}

/// Put the requirement changes on a fresh branch in the main repo and push it.
///
/// Steps:
/// 1. `git checkout -b upgrade-zulip-api-X`
/// 2. `git add <requirement files>`
/// 3. `git commit -m "requirements: Upgrade to version X of the Zulip API packages." -- <files>`
/// 4. `git push <remote> upgrade-zulip-api-X`
pub fn commit_main_repo_upgrade<R: ToolRunner + ?Sized>(
    runner: &R,
    main_repo: &Path,
    version: &ReleaseVersion,
    files: &[PathBuf],
    remote: &str,
) -> Result<String, ReleaseError> {
    let branch = version.upgrade_branch();

    run_checked(runner, &Invocation::git(main_repo, ["checkout", "-b", &branch]))?;
    stage_files(runner, main_repo, files)?;

    let message = main_repo_commit_message(version);
    commit_files(runner, main_repo, &message, files)?;

    run_checked(runner, &Invocation::git(main_repo, ["push", remote, &branch]))
        .map_err(ReleaseError::PushFailed)?;

    Ok(branch)
}

fn stage_files<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    files: &[PathBuf],
) -> Result<(), ToolError> {
    let invocation = Invocation::git(repo, ["add", "--"]).args(pathspec(files));
    run_checked(runner, &invocation)?;
    Ok(())
}

/// Commit exactly `files`, whatever else is staged.
fn commit_files<R: ToolRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    message: &str,
    files: &[PathBuf],
) -> Result<(), ToolError> {
    let invocation = Invocation::git(repo, ["commit", "-m", message, "--"]).args(pathspec(files));
    run_checked(runner, &invocation)?;
    Ok(())
}

fn pathspec(files: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    files.iter().map(|p| p.display().to_string())
}

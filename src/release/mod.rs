//! Release pipeline: automate the full package release flow.
//!
//! Orchestrates preflight checks, artifact cleanup, version stamping,
//! distribution builds, git commit/tag/push, upload, and the main repo
//! requirements upgrade. Stages run in that fixed order and only when
//! selected.

pub mod dist;
pub mod executor;
pub mod preflight;
pub mod requirements;
pub mod version_files;

use std::path::PathBuf;

use tracing::debug;

use crate::error::ReleaseError;
use crate::layout::{RepoLayout, VersionTarget};
use crate::tool::ToolRunner;
use crate::version::{CommitHash, GitRef, ReleaseVersion};

use self::version_files::set_variable;

/// Configuration for a release run, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Root of the API repository.
    pub repo: PathBuf,
    pub version: ReleaseVersion,
    pub cleanup: bool,
    pub build: bool,
    /// Remote to push the release commit and tag to.
    pub push: Option<String>,
    pub release: bool,
    /// Checkout of the main repo whose requirements get upgraded.
    pub main_repo: Option<PathBuf>,
    pub hash: Option<CommitHash>,
    pub main_repo_remote: String,
    pub python: String,
    pub twine: String,
}

impl ReleaseConfig {
    /// Whether any selected stage publishes something outside this machine.
    pub fn is_outward(&self) -> bool {
        self.push.is_some() || self.release || self.main_repo.is_some()
    }

    /// Human-readable lines describing what the run will do.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!("Version:     {}", self.version)];
        if self.cleanup {
            lines.push("Cleanup:     build/, temp/, dist/, *.egg-info/".to_string());
        }
        if self.build {
            lines.push("Build:       sdist + wheel for zulip, zulip_bots, zulip_botserver".to_string());
        }
        if let Some(remote) = &self.push {
            lines.push(format!(
                "Commit:      {}",
                executor::release_commit_message(&self.version)
            ));
            lines.push(format!("Tag:         {}", self.version));
            lines.push(format!("Push to:     {}", remote));
        }
        if self.release {
            lines.push(format!("Upload:      */dist/* via {}", self.twine));
        }
        if let Some(main_repo) = &self.main_repo {
            let git_ref = GitRef::new(&self.version, self.hash.as_ref());
            lines.push(format!("Main repo:   {} (pins @{})", main_repo.display(), git_ref));
            lines.push(format!(
                "Branch:      {} -> {}",
                self.version.upgrade_branch(),
                self.main_repo_remote
            ));
        }
        lines
    }
}

/// Run the release pipeline.
///
/// `confirm` is consulted once, after preflight and before any stage runs,
/// when the run publishes anything. Returning `false` cancels the run.
pub fn run_release<R, C>(config: &ReleaseConfig, runner: &R, confirm: C) -> Result<(), ReleaseError>
where
    R: ToolRunner + ?Sized,
    C: FnOnce(&ReleaseConfig) -> bool,
{
    let layout = RepoLayout::new(&config.repo);

    // ── Stage 1: Preflight checks ──
    let preflight = preflight::run_checks(config, runner)?;
    println!("  [PASS] Preflight checks");
    if let Some(branch) = &preflight.current_branch {
        debug!("Releasing from branch {}", branch);
    }

    if config.is_outward() && !confirm(config) {
        return Err(ReleaseError::Cancelled);
    }

    // ── Stage 2: Cleanup ──
    if config.cleanup {
        cleanup_all(&layout)?;
    }

    // ── Stage 3: Build ──
    if config.build {
        build_all(config, &layout, runner)?;
    }

    // ── Stage 4: Commit, tag, push ──
    if let Some(remote) = &config.push {
        push_release(config, &layout, runner, remote)?;
    }

    // ── Stage 5: Upload ──
    if config.release {
        upload_all(config, &layout, runner)?;
    }

    // ── Stage 6: Main repo requirements ──
    if let Some(main_repo) = &config.main_repo {
        let git_ref = GitRef::new(&config.version, config.hash.as_ref());
        let files =
            requirements::update_requirements_in_main_repo(main_repo, &config.version, &git_ref)?;
        println!("  [DONE] Updated API package requirements in {}", main_repo.display());

        let branch = executor::commit_main_repo_upgrade(
            runner,
            main_repo,
            &config.version,
            &files,
            &config.main_repo_remote,
        )?;
        println!("  [DONE] Pushed {} to {}", branch, config.main_repo_remote);
    }

    Ok(())
}

fn cleanup_all(layout: &RepoLayout) -> Result<(), ReleaseError> {
    for package in layout.packages() {
        for dir in dist::cleanup(&package)? {
            println!("  [DONE] Removed {}", dir.display());
        }
    }
    Ok(())
}

/// Stamp versions and build every package.
///
/// The package-index marker is switched off again even when a build fails.
fn build_all<R: ToolRunner + ?Sized>(
    config: &ReleaseConfig,
    layout: &RepoLayout,
    runner: &R,
) -> Result<(), ReleaseError> {
    for package in layout.packages() {
        dist::cleanup(&package)?;
    }

    for target in layout.version_targets(&config.version) {
        apply(&target)?;
    }

    apply(&layout.pypa_marker(true))?;

    let built = build_packages(config, layout, runner);
    let reset = apply(&layout.pypa_marker(false));

    built?;
    reset
}

fn build_packages<R: ToolRunner + ?Sized>(
    config: &ReleaseConfig,
    layout: &RepoLayout,
    runner: &R,
) -> Result<(), ReleaseError> {
    for package in layout.packages() {
        dist::build_sdist(runner, &config.python, &package)?;
        println!("  [DONE] Built sdist for {}", package.name);

        dist::build_wheel(runner, &config.python, &package)?;
        println!("  [DONE] Built wheel for {}", package.name);
    }
    Ok(())
}

fn apply(target: &VersionTarget) -> Result<(), ReleaseError> {
    set_variable(&target.path, target.variable, &target.value)?;
    Ok(())
}

fn push_release<R: ToolRunner + ?Sized>(
    config: &ReleaseConfig,
    layout: &RepoLayout,
    runner: &R,
    remote: &str,
) -> Result<(), ReleaseError> {
    let files: Vec<PathBuf> = layout
        .version_targets(&config.version)
        .into_iter()
        .map(|t| t.path)
        .collect();
    let tag = config.version.to_string();

    let commit = executor::commit_release(runner, layout.root(), &config.version, &files)?;
    if commit.commit_created {
        println!(
            "  [DONE] Created commit: {}",
            executor::release_commit_message(&config.version)
        );
    } else {
        println!("  [SKIP] No changes to commit; using current HEAD");
    }

    if let Err(e) = executor::tag_release(runner, layout.root(), &config.version) {
        eprintln!("  [FAIL] {}", e);
        if commit.commit_created {
            eprintln!("Manual cleanup may be needed: git reset --soft HEAD~1");
        }
        return Err(e.into());
    }
    println!("  [DONE] Created tag: {}", tag);

    match executor::push_with_tags(runner, layout.root(), remote) {
        Ok(()) => {
            println!("  [DONE] Pushed to {}", remote);
            Ok(())
        }
        Err(push) => {
            eprintln!("  [FAIL] {}", push);
            eprintln!("Rolling back...");

            match executor::rollback(runner, layout.root(), &tag, commit.commit_created) {
                Ok(()) => {
                    eprintln!("  [DONE] Deleted tag {}", tag);
                    if commit.commit_created {
                        eprintln!("  [DONE] Reset release commit");
                    }
                    Err(ReleaseError::PushFailed(push))
                }
                Err(rollback) => {
                    if commit.commit_created {
                        eprintln!(
                            "Manual cleanup may be needed: git tag -d {} && git reset --soft HEAD~1",
                            tag
                        );
                    } else {
                        eprintln!("Manual cleanup may be needed: git tag -d {}", tag);
                    }
                    Err(ReleaseError::RollbackFailed { push, rollback })
                }
            }
        }
    }
}

fn upload_all<R: ToolRunner + ?Sized>(
    config: &ReleaseConfig,
    layout: &RepoLayout,
    runner: &R,
) -> Result<(), ReleaseError> {
    let dists = dist::collect_distributions(layout)?;

    println!("  Uploading distributions:");
    for path in &dists {
        println!("    {}", path.display());
    }

    dist::upload(runner, &config.twine, layout, &dists)?;
    println!("  [DONE] Uploaded {} files", dists.len());
    Ok(())
}

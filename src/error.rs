//! Error types for release-packages modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from running external tools.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} not found on PATH")]
    NotInstalled(String),

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Errors from in-place text file rewriting.
#[derive(Error, Debug)]
pub enum VersionFileError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("No line starting with `{variable}` in {path}")]
    VariableNotFound { path: PathBuf, variable: String },

    #[error("No `{marker}` requirement line in {path}")]
    MarkerNotFound { path: PathBuf, marker: String },
}

/// Errors from the release pipeline.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid version '{0}'. Expected something like 0.4.0 or 0.5.0rc1")]
    InvalidVersion(String),

    #[error("Invalid commit hash '{0}'. Expected 7 to 40 hex digits")]
    InvalidHash(String),

    #[error("Commit {hash} not found in {repo}")]
    UnknownCommit { hash: String, repo: PathBuf },

    #[error("Package directory {0} has no setup.py")]
    MissingPackage(PathBuf),

    #[error("Not a git repository: {path}: {source}")]
    NotARepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Git inspection failed: {0}")]
    Git(#[from] git2::Error),

    #[error("HEAD is detached in {0}. Check out a branch before pushing a release")]
    DetachedHead(PathBuf),

    #[error("Tag {0} already exists")]
    TagAlreadyExists(String),

    #[error("Branch {0} already exists in the main repo")]
    BranchAlreadyExists(String),

    #[error("{0} has uncommitted changes")]
    UncommittedChanges(PathBuf),

    #[error("Requirements file {0} does not exist")]
    MissingRequirements(PathBuf),

    #[error("No distributions found under */dist/ in {0}. Run with --build first")]
    NoDistributions(PathBuf),

    #[error("Failed to remove {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Release cancelled")]
    Cancelled,

    #[error("Push failed: {0}")]
    PushFailed(#[source] ToolError),

    #[error("Push failed ({push}) and rollback failed ({rollback})")]
    RollbackFailed {
        push: ToolError,
        rollback: ToolError,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    VersionFile(#[from] VersionFileError),
}

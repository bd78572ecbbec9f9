//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, Signature};

use release_packages::{
    Invocation, ReleaseConfig, ReleaseVersion, ToolError, ToolOutput, ToolRunner,
};

pub const ZULIP_INIT: &str = "\
import os
__version__ = \"0.3.9\"

def version():
    return __version__
";

pub const ZULIP_SETUP: &str = "\
from setuptools import setup
from zulip import version

setup(name='zulip', version=version())
";

pub const BOTS_SETUP: &str = "\
#!/usr/bin/env python
ZULIP_BOTS_VERSION = \"0.3.9\"
IS_PYPA_PACKAGE = False

package_data = {
    '': ['doc.md', '*.conf', 'assets/*']
}
";

pub const BOTSERVER_SETUP: &str = "\
#!/usr/bin/env python
ZULIP_BOTSERVER_VERSION = \"0.3.9\"
";

pub const COMMON_IN: &str = "\
# Zulip API packages
-e \"git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip==0.3.9+git&subdirectory=zulip\"
-e \"git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip_bots==0.3.9+git&subdirectory=zulip_bots\"
Django==1.11.6
";

pub const PINNED_TXT: &str = "\
Django==1.11.6
git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip==0.3.9+git&subdirectory=zulip
git+https://github.com/zulip/python-zulip-api.git@0.3.9#egg=zulip_bots==0.3.9+git&subdirectory=zulip_bots
";

/// Write the three-package API repository layout under `root`.
pub fn write_api_repo(root: &Path) {
    write(root, "zulip/setup.py", ZULIP_SETUP);
    write(root, "zulip/zulip/__init__.py", ZULIP_INIT);
    write(root, "zulip_bots/setup.py", BOTS_SETUP);
    write(root, "zulip_botserver/setup.py", BOTSERVER_SETUP);
}

/// Write the main repo requirement files under `root`.
pub fn write_main_repo(root: &Path) {
    write(root, "requirements/common.in", COMMON_IN);
    write(root, "requirements/prod.txt", PINNED_TXT);
    write(root, "requirements/dev.txt", PINNED_TXT);
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("path has a parent"))
        .expect("Failed to create parent directory");
    std::fs::write(&path, content).expect("Failed to write fixture file");
}

pub fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative))
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
}

/// Release config with no stage selected.
pub fn config(repo: &Path, version: &str) -> ReleaseConfig {
    ReleaseConfig {
        repo: repo.to_path_buf(),
        version: version.parse::<ReleaseVersion>().expect("valid version"),
        cleanup: false,
        build: false,
        push: None,
        release: false,
        main_repo: None,
        hash: None,
        main_repo_remote: "origin".to_string(),
        python: "python3".to_string(),
        twine: "twine".to_string(),
    }
}

/// A tool runner that records invocations instead of spawning processes.
///
/// Every command succeeds unless its leading arguments match a configured
/// failure. `git diff --cached --quiet` reports staged changes when
/// `staged_changes` is set.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: RefCell<Vec<Invocation>>,
    failures: Vec<(String, Vec<String>, i32)>,
    missing: Vec<String>,
    staged_changes: bool,
    watched: Option<PathBuf>,
    /// Content of the watched file at each invocation.
    pub snapshots: RefCell<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `program` invocations whose arguments start with `args_prefix`.
    pub fn fail_on(mut self, program: &str, args_prefix: &[&str], code: i32) -> Self {
        self.failures.push((
            program.to_string(),
            args_prefix.iter().map(|s| s.to_string()).collect(),
            code,
        ));
        self
    }

    pub fn with_missing_tool(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn with_staged_changes(mut self) -> Self {
        self.staged_changes = true;
        self
    }

    /// Record the content of `path` every time a command runs.
    pub fn watching(mut self, path: PathBuf) -> Self {
        self.watched = Some(path);
        self
    }

    /// Recorded invocations as `program arg arg ...` strings.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.borrow_mut().push(invocation.clone());

        if let Some(path) = &self.watched {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            self.snapshots.borrow_mut().push(content);
        }

        let failure = self.failures.iter().find(|(program, prefix, _)| {
            *program == invocation.program && invocation.args.starts_with(prefix)
        });
        if let Some((_, _, code)) = failure {
            return Ok(ToolOutput {
                code: *code,
                stdout: String::new(),
                stderr: format!("simulated failure: {}", invocation),
            });
        }

        let is_staged_check = invocation.program == "git"
            && invocation.args.starts_with(&["diff", "--cached", "--quiet"].map(String::from));
        let code = if is_staged_check && self.staged_changes { 1 } else { 0 };

        Ok(ToolOutput {
            code,
            ..ToolOutput::default()
        })
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Stage every file in the working tree and commit. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig = self.signature();

        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        // Get parent commit if exists
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());

        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Create a lightweight tag pointing to the given OID.
    pub fn tag_lightweight(&self, name: &str, oid: Oid) {
        let obj = self.repo.find_object(oid, None).expect("Failed to find object");
        self.repo
            .tag_lightweight(name, &obj, false)
            .expect("Failed to create lightweight tag");
    }

    /// Create a branch pointing to the given OID.
    pub fn branch(&self, name: &str, oid: Oid) {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        self.repo
            .branch(name, &commit, false)
            .expect("Failed to create branch");
    }

    /// Configure a committer identity so the system `git` can commit and tag.
    pub fn with_identity(self) -> Self {
        let mut config = self.repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");
        config.set_bool("commit.gpgsign", false).expect("Failed to set commit.gpgsign");
        config.set_bool("tag.gpgsign", false).expect("Failed to set tag.gpgsign");
        drop(config);
        self
    }

    /// Stage one working tree file without committing it.
    pub fn stage(&self, relative: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(relative)).expect("Failed to stage file");
        index.write().expect("Failed to write index");
    }

    /// Add a remote pointing at a fresh bare repository and return it.
    pub fn add_bare_remote(&self, name: &str) -> BareRemote {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init_bare(dir.path()).expect("Failed to init bare repo");
        let url = dir.path().display().to_string();
        self.repo.remote(name, &url).expect("Failed to add remote");
        BareRemote { dir, repo }
    }

    /// Name of the branch HEAD points at.
    pub fn current_branch(&self) -> String {
        self.repo
            .head()
            .expect("Failed to read HEAD")
            .shorthand()
            .expect("HEAD has no name")
            .to_string()
    }

    /// Detach HEAD at the given OID.
    pub fn detach(&self, oid: Oid) {
        self.repo.set_head_detached(oid).expect("Failed to detach HEAD");
    }
}

/// A bare repository acting as a push target.
pub struct BareRemote {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl BareRemote {
    /// Commit at the tip of `branch`.
    pub fn branch_tip(&self, branch: &str) -> git2::Commit<'_> {
        self.repo
            .find_branch(branch, git2::BranchType::Local)
            .unwrap_or_else(|e| panic!("Branch {} not pushed: {}", branch, e))
            .get()
            .peel_to_commit()
            .expect("Branch does not point at a commit")
    }

    /// Whether `path` is present in the tree of `commit`.
    pub fn tree_has(commit: &git2::Commit<'_>, path: &str) -> bool {
        commit
            .tree()
            .expect("Commit has no tree")
            .get_path(Path::new(path))
            .is_ok()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.repo.find_reference(&format!("refs/tags/{}", tag)).is_ok()
    }
}

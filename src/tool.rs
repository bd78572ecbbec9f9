//! External tool invocation.
//!
//! Every side effect outside the filesystem (git, the Python build, twine)
//! goes through [`ToolRunner`], so the pipeline can be exercised in tests
//! without touching real repositories or the package index.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::ToolError;

/// Environment variable to override the Python interpreter used for builds.
pub const PYTHON_ENV_VAR: &str = "RELEASE_PACKAGES_PYTHON";

/// Environment variable to override the twine executable used for uploads.
pub const TWINE_ENV_VAR: &str = "RELEASE_PACKAGES_TWINE";

const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_TWINE: &str = "twine";

/// Python interpreter to run `setup.py` with.
pub fn python_program() -> String {
    program_from_env(PYTHON_ENV_VAR, DEFAULT_PYTHON)
}

/// twine executable to upload distributions with.
pub fn twine_program() -> String {
    program_from_env(TWINE_ENV_VAR, DEFAULT_TWINE)
}

/// Read a program name from the environment, falling back to `default`.
///
/// Logs a warning if the variable is set but blank.
fn program_from_env(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        Ok(_) => {
            warn!("Empty {} value, using default {}", var, default);
            default.to_string()
        }
        Err(_) => default.to_string(),
    }
}

/// One external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shorthand for a `git` invocation in `cwd`.
    pub fn git<I, S>(cwd: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", cwd).args(args)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait for executing external tools.
///
/// `execute` only fails when the process cannot be started; exit status is
/// reported through [`ToolOutput::code`]. Use [`run_checked`] when a non-zero
/// exit should be an error.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;

    /// Whether `program` can be found on PATH.
    fn is_available(&self, program: &str) -> bool;
}

/// Runner that spawns real processes via `std::process::Command`.
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        debug!("Running `{}` in {}", invocation, invocation.cwd.display());

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .output()
            .map_err(|source| ToolError::SpawnFailed {
                program: invocation.program.clone(),
                source,
            })?;

        let result = ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.stdout.trim().is_empty() {
            debug!("{} stdout:\n{}", invocation.program, result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            debug!("{} stderr:\n{}", invocation.program, result.stderr.trim_end());
        }

        Ok(result)
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Run an invocation and turn a non-zero exit into [`ToolError::NonZeroExit`].
pub fn run_checked<R: ToolRunner + ?Sized>(
    runner: &R,
    invocation: &Invocation,
) -> Result<ToolOutput, ToolError> {
    let output = runner.execute(invocation)?;

    if !output.success() {
        return Err(ToolError::NonZeroExit {
            command: invocation.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Fail with [`ToolError::NotInstalled`] unless `program` is on PATH.
pub fn require_tool<R: ToolRunner + ?Sized>(runner: &R, program: &str) -> Result<(), ToolError> {
    if runner.is_available(program) {
        Ok(())
    } else {
        Err(ToolError::NotInstalled(program.to_string()))
    }
}
